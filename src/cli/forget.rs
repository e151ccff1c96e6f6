use anyhow::Result;
use memory_store::host::{FileHost, SimpleRuntime};
use memory_store::{forget, ForgetArgs};

pub fn run(
    host: &FileHost,
    runtime: &SimpleRuntime,
    id: Option<String>,
    key: Option<String>,
    query: Option<String>,
    scope: String,
    all_matching: bool,
) -> Result<()> {
    let result = forget(
        ForgetArgs {
            id,
            key,
            query,
            scope: Some(scope),
            all_matching: Some(all_matching),
        },
        runtime,
        host,
    )?;

    if result.removed_count == 0 {
        println!("Nothing matched.");
        return Ok(());
    }
    for memory in &result.removed {
        println!("Removed [{}] {}", memory.id, memory.fact);
    }
    println!(
        "\n{} removed, {} remaining (scope: {})",
        result.removed_count, result.remaining_count, result.scope
    );
    Ok(())
}

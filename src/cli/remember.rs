use anyhow::Result;
use memory_store::host::{FileHost, SimpleRuntime};
use memory_store::{remember, RememberArgs};

#[allow(clippy::too_many_arguments)]
pub fn run(
    host: &FileHost,
    runtime: &SimpleRuntime,
    fact: String,
    key: Option<String>,
    tags: Vec<String>,
    importance: Option<i32>,
    no_overwrite: bool,
) -> Result<()> {
    let result = remember(
        RememberArgs {
            fact: Some(fact),
            key,
            tags: (!tags.is_empty()).then_some(tags),
            importance,
            overwrite_key: Some(!no_overwrite),
        },
        runtime,
        host,
    )?;

    println!("{} [{}] {}", result.status, result.memory.id, result.memory.fact);
    if !result.memory.key.is_empty() || !result.memory.tags.is_empty() {
        println!("    key={} tags={}", result.memory.key, result.memory.tags.join(", "));
    }
    println!("    total memories: {}", result.total_memories);
    Ok(())
}

use anyhow::Result;
use memory_store::host::{FileHost, SimpleRuntime};
use memory_store::{recall, RecallArgs};

pub fn run(
    host: &FileHost,
    runtime: &SimpleRuntime,
    query: Option<String>,
    key: Option<String>,
    tags: Vec<String>,
    scope: String,
    limit: i32,
) -> Result<()> {
    let result = recall(
        RecallArgs {
            query,
            key,
            tags: (!tags.is_empty()).then_some(tags),
            scope: Some(scope),
            limit: Some(limit),
        },
        runtime,
        host,
    );

    if result.memories.is_empty() {
        println!("No memories found.");
        return Ok(());
    }

    for memory in &result.memories {
        println!("[{}] (importance: {}) {}", memory.id, memory.importance, memory.fact);
        if !memory.key.is_empty() || !memory.tags.is_empty() {
            println!("     key={} tags={}", memory.key, memory.tags.join(", "));
        }
    }
    println!("\n{} matched (scope: {})", result.count, result.scope);
    Ok(())
}

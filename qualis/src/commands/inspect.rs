// qualis/src/commands/inspect.rs
//
// USE CASE: Inspect the source table (schema + sample rows).

use std::path::PathBuf;

use futures::StreamExt;
use qualis_core::ports::row_source::RowSource;

use super::{load_config, open_source};

pub async fn execute(project_dir: PathBuf, limit: usize) -> anyhow::Result<()> {
    let config = load_config(&project_dir)?;
    let source = open_source(&project_dir, &config)?;
    let table = &config.source.table;

    println!("\n🔍 Inspecting Table: '{}'", table);

    let columns = source.columns(table).await?;
    println!("   Columns: [{}]", columns.join(", "));
    println!("   --- Rows (Limit {}) ---", limit);

    let mut rows = source.scan(table, None).await?.take(limit);
    while let Some(record) = rows.next().await {
        let values: Vec<String> = record?.values().iter().map(ToString::to_string).collect();
        println!("   ➜ {}", values.join(" | "));
    }

    Ok(())
}

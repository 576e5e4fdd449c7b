// qualis/src/commands/profile.rs
//
// USE CASE: Per-column row / null / distinct counts for the source table.

use std::path::PathBuf;

use anyhow::Context;
use qualis_core::application::profile_dataset;

use super::{load_config, open_source};
use crate::cli::OutputFormat;
use crate::render::profile_text;

pub async fn execute(project_dir: PathBuf, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(&project_dir)?;
    let source = open_source(&project_dir, &config)?;

    let profile = profile_dataset(&source, &config.source.table)
        .await
        .with_context(|| format!("Failed to profile '{}'", config.source.table))?;

    match format {
        OutputFormat::Text => print!("{}", profile_text(&profile)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&profile)?),
    }
    Ok(())
}

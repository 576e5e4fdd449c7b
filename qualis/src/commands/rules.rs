// qualis/src/commands/rules.rs
//
// USE CASE: List (and thereby validate) the rule definitions.

use std::path::PathBuf;

use anyhow::Context;
use qualis_core::infrastructure::config::build_registry;

use super::load_config;
use crate::render::rules_text;

pub fn execute(project_dir: PathBuf) -> anyhow::Result<()> {
    let config = load_config(&project_dir)?;
    let registry = build_registry(&project_dir, &config)
        .context("Failed to build the rule registry")?;

    println!(
        "📋 {} rules registered for '{}'",
        registry.len(),
        config.source.table
    );
    print!("{}", rules_text(registry.all()));
    Ok(())
}

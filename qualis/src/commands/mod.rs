// qualis/src/commands/mod.rs

pub mod inspect;
pub mod profile;
pub mod rules;
pub mod run;

use std::path::Path;

use anyhow::Context;
use tracing::debug;
use qualis_core::infrastructure::adapters::DuckDbSource;
use qualis_core::infrastructure::config::{ProjectConfig, load_project_config};

/// Loads `qualis.yaml` from the project directory.
pub(crate) fn load_config(project_dir: &Path) -> anyhow::Result<ProjectConfig> {
    load_project_config(project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })
}

/// Opens the configured DuckDB database and registers the CSV view, if any.
pub(crate) fn open_source(project_dir: &Path, config: &ProjectConfig) -> anyhow::Result<DuckDbSource> {
    let db_path = config.database_path(project_dir);
    debug!(database = %db_path, table = %config.source.table, "opening source");
    let source = DuckDbSource::new(&db_path)
        .with_context(|| format!("Failed to initialize DuckDB at {}", db_path))?;

    if let Some(csv) = config.csv_path(project_dir) {
        source
            .register_csv(&config.source.table, &csv)
            .with_context(|| format!("Failed to register CSV {}", csv.display()))?;
    }

    Ok(source)
}

// qualis-core/src/infrastructure/config/project.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::infrastructure::config::rules::RuleDefinition;
use crate::infrastructure::error::InfrastructureError;

const CONFIG_CANDIDATES: [&str; 3] = ["qualis.yaml", "qualis.yml", "qualis_project_conf.yaml"];

// =============================================================================
//  1. PROJECT CONTRACT
// =============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct ProjectConfig {
    #[validate(length(min = 1, message = "Project name cannot be empty"))]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[validate(nested)]
    pub source: SourceConfig,

    #[serde(default)]
    #[validate(nested)]
    pub evaluation: EvaluationConfig,

    #[serde(rename = "rule-paths", default)]
    pub rule_paths: Vec<String>,

    #[serde(default)]
    #[validate(nested)]
    pub rules: Vec<RuleDefinition>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct SourceConfig {
    /// DuckDB file, relative to the project directory, or `:memory:`.
    #[serde(default = "default_database")]
    #[validate(length(min = 1))]
    pub database: String,

    /// Table (or view) the rules run against.
    #[validate(length(min = 1, message = "Source table cannot be empty"))]
    pub table: String,

    /// Optional CSV file exposed as a view named after `table`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
pub struct EvaluationConfig {
    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub concurrency: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_sample_limit")]
    #[validate(range(max = 1000))]
    pub sample_limit: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: None,
            sample_limit: default_sample_limit(),
        }
    }
}

fn default_version() -> String {
    "0.1.0".to_string()
}
fn default_database() -> String {
    ":memory:".to_string()
}
fn default_concurrency() -> usize {
    4
}
fn default_sample_limit() -> usize {
    5
}

impl ProjectConfig {
    /// Database location with relative paths anchored at the project directory.
    pub fn database_path(&self, project_dir: &Path) -> String {
        if self.source.database == ":memory:" {
            return self.source.database.clone();
        }
        anchor(project_dir, &self.source.database)
            .to_string_lossy()
            .into_owned()
    }

    pub fn csv_path(&self, project_dir: &Path) -> Option<PathBuf> {
        self.source.csv.as_deref().map(|p| anchor(project_dir, p))
    }
}

fn anchor(project_dir: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}

// =============================================================================
//  2. LOADER
// =============================================================================

#[instrument]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading project configuration");

    let content = fs::read_to_string(&config_path)?;
    let mut config = parse_project_config(&content, &config_path.display().to_string())?;

    // Layering: QUALIS_TABLE=orders_v2 qualis run
    apply_overrides(&mut config, |key| std::env::var(key).ok())?;

    config.validate()?;
    Ok(config)
}

pub fn parse_project_config(
    content: &str,
    origin: &str,
) -> Result<ProjectConfig, InfrastructureError> {
    serde_yaml::from_str(content).map_err(|source| InfrastructureError::YamlError {
        path: origin.to_string(),
        source,
    })
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.exists())
        .ok_or_else(|| {
            InfrastructureError::ConfigNotFound(format!(
                "No configuration file found in {:?}. Checked: {:?}",
                root, CONFIG_CANDIDATES
            ))
        })
}

fn apply_overrides<F>(config: &mut ProjectConfig, lookup: F) -> Result<(), InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("QUALIS_DATABASE") {
        info!(old = ?config.source.database, new = ?val, "Overriding database via ENV");
        config.source.database = val;
    }
    if let Some(val) = lookup("QUALIS_TABLE") {
        info!(old = ?config.source.table, new = ?val, "Overriding table via ENV");
        config.source.table = val;
    }
    if let Some(val) = lookup("QUALIS_CONCURRENCY") {
        config.evaluation.concurrency = val.parse().map_err(|_| {
            InfrastructureError::ConfigError(format!("QUALIS_CONCURRENCY is not a number: {}", val))
        })?;
    }
    Ok(())
}

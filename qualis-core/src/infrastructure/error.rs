// qualis-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(qualis::infra::database::duckdb),
        help("An error occurred inside the SQL engine.")
    )]
    DuckDB(#[from] duckdb::Error),

    #[error("DuckDB connection lock poisoned")]
    #[diagnostic(code(qualis::infra::database::poisoned))]
    Poisoned,

    #[error("Background scan task failed: {0}")]
    #[diagnostic(code(qualis::infra::database::task))]
    Task(String),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(qualis::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error in {path}: {source}")]
    #[diagnostic(
        code(qualis::infra::yaml),
        help("Check your YAML syntax (indentation, types, rule `kind`).")
    )]
    YamlError {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(qualis::infra::config))]
    ConfigError(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(qualis::infra::config_invalid))]
    Validation(#[from] validator::ValidationErrors),

    #[error("Project configuration not found: {0}")]
    #[diagnostic(code(qualis::infra::config_missing))]
    ConfigNotFound(String),

    // --- EXPRESSIONS ---
    #[error("Cannot compile expression '{expression}': {reason}")]
    #[diagnostic(
        code(qualis::infra::expression),
        help("Supported: comparisons, AND/OR/NOT, IS [NOT] NULL, [NOT] LIKE, literals.")
    )]
    Expression { expression: String, reason: String },
}

// Shortcut for `?` on duckdb calls
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}

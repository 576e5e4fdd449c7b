// qualis-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QualisError {
    // --- DOMAIN ERRORS (registry, rule evaluation) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (IO, parsing, database) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- RUN ERRORS ---
    /// The dataset could not be opened. Aborts a run before any rule executes.
    #[error("Source unavailable: dataset '{dataset}' could not be opened ({reason})")]
    SourceUnavailable { dataset: String, reason: String },

    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl QualisError {
    pub fn source_unavailable(dataset: &str, reason: impl ToString) -> Self {
        QualisError::SourceUnavailable {
            dataset: dataset.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for QualisError {
    fn from(err: std::io::Error) -> Self {
        QualisError::Infrastructure(InfrastructureError::Io(err))
    }
}

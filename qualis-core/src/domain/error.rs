// qualis-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum DomainError {
    #[error("Rule '{0}' is already registered")]
    #[diagnostic(
        code(qualis::domain::duplicate_rule),
        help("Rule names must be unique across inline rules and rule files.")
    )]
    DuplicateRuleName(String),

    #[error("Registry is locked: cannot register '{0}' after a run has started")]
    #[diagnostic(code(qualis::domain::registry_locked))]
    RegistryLocked(String),

    #[error("Rule '{0}' not found in registry")]
    #[diagnostic(code(qualis::domain::rule_not_found))]
    RuleNotFound(String),

    #[error("Invalid rule '{rule}': {reason}")]
    #[diagnostic(code(qualis::domain::invalid_rule))]
    InvalidRule { rule: String, reason: String },

    #[error("Rule '{rule}' failed to evaluate: {reason}")]
    #[diagnostic(code(qualis::domain::rule_evaluation))]
    RuleEvaluation { rule: String, reason: String },

    /// Failure reported by a custom predicate; the rule name is added by the caller.
    #[error("{0}")]
    #[diagnostic(code(qualis::domain::predicate))]
    Predicate(String),

    #[error("Cannot compare {left} with {right}")]
    #[diagnostic(
        code(qualis::domain::type_mismatch),
        help("Both sides of a comparison must be numbers, texts, booleans or dates.")
    )]
    TypeMismatch { left: String, right: String },

    #[error("Record has {values} values for {columns} columns")]
    #[diagnostic(code(qualis::domain::record_shape))]
    RecordShape { columns: usize, values: usize },
}

impl DomainError {
    pub fn evaluation(rule: &str, reason: impl ToString) -> Self {
        DomainError::RuleEvaluation {
            rule: rule.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(rule: &str, reason: impl ToString) -> Self {
        DomainError::InvalidRule {
            rule: rule.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub mod error;
pub mod quality;
pub mod record;
pub mod report;

// Shortcuts used by adapters and the CLI
pub use error::DomainError;
pub use quality::{Check, Comparison, Operand, Predicate, Rule, RuleKind, RuleRegistry};
pub use record::{Record, Value};
pub use report::{
    ColumnCount, OverallStatus, Report, RuleResult, RuleStatus, RunState, Summary, Violation,
};

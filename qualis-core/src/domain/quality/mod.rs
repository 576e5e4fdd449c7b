// qualis-core/src/domain/quality/mod.rs

pub mod predicate;
pub mod registry;
pub mod rule;
pub mod tally;

// Re-exports
pub use predicate::{Operand, Predicate, RecordPredicate};
pub use registry::RuleRegistry;
pub use rule::{Check, Comparison, Rule, RuleKind};
pub use tally::RuleTally;

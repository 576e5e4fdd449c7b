pub mod project;
pub mod rules;

pub use project::{EvaluationConfig, ProjectConfig, SourceConfig, load_project_config};
pub use rules::{CheckDefinition, ColumnSet, RuleDefinition, build_registry};

// qualis-core/src/application/mod.rs

pub mod evaluator;
pub mod profile;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Lets the CLI write `use qualis_core::application::{Evaluator, profile_dataset};`

pub use evaluator::{EvaluationOptions, Evaluator};
pub use profile::{ColumnProfile, DatasetProfile, profile_dataset};

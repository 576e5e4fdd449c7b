pub mod expression;

pub use expression::{compile_predicate, compile_predicate_lenient};

// qualis-core/src/lib.rs

#![allow(missing_docs)]
// Memory safety
#![deny(unsafe_code)]
// Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts the engine needs from the outside world (RowSource).
pub mod ports;

// 2. Domain
// Records, rules, registry and report. Depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB / in-memory sources, YAML configuration, SQL expression compiler.
pub mod infrastructure;

// 4. Application (Use Cases)
// Evaluator and dataset profiling.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::QualisError;

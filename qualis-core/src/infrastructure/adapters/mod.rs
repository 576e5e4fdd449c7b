pub mod duckdb;
pub mod memory;

pub use self::duckdb::DuckDbSource;
pub use self::memory::InMemorySource;

//! Common infrastructure shared across DagPlanner crates.
//!
//! # Feature Tiers
//!
//! - default: SQLite pooling, pragmas and health reporting
//! - `test-utils`: temporary databases for integration tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod storage;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use storage::{
    HealthStatus, PoolError, PoolResult, SqliteConnection, SqlitePool, SqlitePoolConfig,
};

//! Testing utilities and helpers
//!
//! - **[`database`]**: temporary on-disk SQLite databases

pub mod database;

pub use database::TestDatabase;

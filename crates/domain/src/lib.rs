//! # DagPlanner Domain
//!
//! Business domain types and models for the DagPlanner calendar cache.
//!
//! This crate contains:
//! - The normalized calendar event model and query descriptors
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other DagPlanner crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;

//! # DagPlanner Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The SQLite event store and its schema-identity check
//! - Configuration loading and tracing initialisation
//! - Provider event mapping for calendar integrations
//! - The cron-driven background sync scheduler
//!
//! ## Architecture
//! - Implements traits defined in `dagplanner-core`
//! - Depends on `dagplanner-common` and `dagplanner-core`
//! - Contains all "impure" code (I/O, clocks, timers)

pub mod config;
pub mod database;
pub mod errors;
pub mod integrations;
pub mod observability;
pub mod scheduling;

// Re-export commonly used items
pub use config::loader::{load, load_from_env, load_from_file};
pub use database::{DbManager, SqliteCalendarEventStore};
pub use errors::InfraError;
pub use observability::init_tracing;
pub use scheduling::{CalendarSyncScheduler, SchedulerError};

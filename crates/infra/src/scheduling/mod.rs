//! Scheduling infrastructure for automated task execution
//!
//! The calendar sync scheduler drives the sync reconciler on a cron
//! expression with explicit start/stop lifecycle, cancellation token and
//! timeout wrapping on all async operations.

pub mod calendar_scheduler;
pub mod error;

pub use calendar_scheduler::{CalendarSyncScheduler, CalendarSyncSchedulerConfig, SyncRunStats};
pub use error::{SchedulerError, SchedulerResult};

//! # DagPlanner Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the event store and the remote calendar provider
//! - The change notifier and live queries built on top of it
//! - The sync reconciler that mirrors remote calendars into the store
//!
//! ## Architecture Principles
//! - Only depends on `dagplanner-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod calendar;

pub use calendar::live_query::{CancelHandle, LiveQuery, LiveQueryState, Snapshot};
pub use calendar::notifier::{ChangeNotifier, Invalidation, Registration, SubscriberId};
pub use calendar::ports::{CalendarEventStore, PartitionReplacement, RemoteCalendarSource};
pub use calendar::query_service::CalendarQueryService;
pub use calendar::sync::{SyncFailure, SyncReconciler, SyncReport, SyncSummary, SyncWindow};

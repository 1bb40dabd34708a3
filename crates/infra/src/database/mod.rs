//! Database implementations

pub mod calendar_event_repository;
pub mod manager;
pub mod schema;

pub use calendar_event_repository::SqliteCalendarEventStore;
pub use manager::DbManager;

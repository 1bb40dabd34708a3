//! Calendar cache: ports, change notification, live queries and sync

pub mod live_query;
pub mod notifier;
pub mod ports;
pub mod query_service;
pub mod sync;

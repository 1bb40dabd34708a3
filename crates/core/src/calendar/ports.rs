//! Calendar port interfaces
//!
//! The store port is implemented by the SQLite adapter in `dagplanner-infra`;
//! the remote port by whatever provider client the application wires in.

use async_trait::async_trait;
use chrono::NaiveDate;
use dagplanner_domain::{CalendarEvent, DateRange, RangeQuery, RemoteCalendar, RemoteError, Result};

/// Row counts of one committed partition replacement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionReplacement {
    /// Rows of the partition that existed before the replacement
    pub removed: usize,
    /// Rows of the partition after the replacement
    pub written: usize,
}

impl PartitionReplacement {
    /// Whether the replacement touched any row at all.
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.written == 0
    }
}

/// Durable keyed table of calendar events.
///
/// Every mutating method is all-or-nothing and signals the change notifier
/// only after its transaction has committed. Readers never observe a partial
/// write.
#[async_trait]
pub trait CalendarEventStore: Send + Sync {
    /// Insert or replace every event by `id` in one transaction.
    ///
    /// Duplicate ids within `events` resolve to the last occurrence.
    async fn upsert_batch(&self, events: Vec<CalendarEvent>) -> Result<()>;

    /// Remove every event.
    async fn delete_all(&self) -> Result<()>;

    /// Remove the events of one partition, leaving the others untouched.
    async fn delete_by_partition(&self, calendar_id: &str) -> Result<()>;

    /// Replace the contents of one partition with `events` in one transaction.
    ///
    /// Aborts without changes if an event id is already owned by another
    /// partition.
    async fn replace_partition(
        &self,
        calendar_id: &str,
        events: Vec<CalendarEvent>,
    ) -> Result<PartitionReplacement>;

    /// Events with `from <= start_date <= to`, ordered by start date, then
    /// start time with all-day events first, then id.
    async fn query_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CalendarEvent>>;

    /// Events starting on `date`, all-day events first, then by start time,
    /// then id.
    async fn query_date(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>>;

    /// Events of one partition ordered by id.
    async fn events_in_partition(&self, calendar_id: &str) -> Result<Vec<CalendarEvent>>;

    /// Total number of cached events.
    async fn count(&self) -> Result<u64>;

    /// Evaluate a live query descriptor once.
    async fn query(&self, descriptor: &RangeQuery) -> Result<Vec<CalendarEvent>> {
        match descriptor {
            RangeQuery::Range(range) => self.query_range(range.from(), range.to()).await,
            RangeQuery::Date(date) => self.query_date(*date).await,
        }
    }
}

/// Remote calendar provider.
///
/// Calls are opaque upstream requests: they return a complete snapshot or
/// fail. Retry policy belongs to the caller.
#[async_trait]
pub trait RemoteCalendarSource: Send + Sync {
    /// Calendars visible to the signed-in account.
    async fn list_calendars(&self) -> std::result::Result<Vec<RemoteCalendar>, RemoteError>;

    /// Complete set of events of `calendar_id` starting inside `window`.
    async fn fetch_calendar_events(
        &self,
        calendar_id: &str,
        window: DateRange,
    ) -> std::result::Result<Vec<CalendarEvent>, RemoteError>;
}

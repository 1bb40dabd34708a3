use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use dagplanner_core::{
    CalendarEventStore, ChangeNotifier, PartitionReplacement, RemoteCalendarSource,
};
use dagplanner_domain::constants::CALENDAR_EVENTS_TABLE;
use dagplanner_domain::{
    CalendarEvent, DateRange, RangeQuery, RemoteCalendar, RemoteError, Result as DomainResult,
    StorageError,
};
use parking_lot::Mutex;

/// In-memory `CalendarEventStore`.
///
/// Mirrors the SQLite adapter's contract: writes are all-or-nothing, ordering
/// matches the SQL `ORDER BY` clauses, and the notifier is signalled after
/// each committed change.
#[derive(Clone)]
pub struct MockCalendarEventStore {
    rows: Arc<Mutex<BTreeMap<String, CalendarEvent>>>,
    notifier: Arc<ChangeNotifier>,
    fail_next_write: Arc<AtomicBool>,
    query_delay: Arc<Mutex<Option<Duration>>>,
    queries: Arc<AtomicUsize>,
}

impl MockCalendarEventStore {
    pub fn new(notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            rows: Arc::default(),
            notifier,
            fail_next_write: Arc::default(),
            query_delay: Arc::default(),
            queries: Arc::default(),
        }
    }

    /// Make the next mutating call abort after its changes were staged.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Delay every query, to widen race windows.
    pub fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock() = Some(delay);
    }

    /// Number of evaluated queries so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Insert rows directly, without signalling the notifier.
    pub fn upsert_seed(&self, events: Vec<CalendarEvent>) {
        let mut rows = self.rows.lock();
        for event in events {
            rows.insert(event.id.clone(), event);
        }
    }

    /// All rows ordered by id.
    pub fn snapshot(&self) -> Vec<CalendarEvent> {
        self.rows.lock().values().cloned().collect()
    }

    /// Apply `mutate` to a scratch copy and swap it in on success.
    fn commit<F>(&self, mutate: F) -> DomainResult<bool>
    where
        F: FnOnce(&mut BTreeMap<String, CalendarEvent>) -> DomainResult<()>,
    {
        let changed = {
            let mut rows = self.rows.lock();
            let mut scratch = rows.clone();
            mutate(&mut scratch)?;
            if self.fail_next_write.swap(false, Ordering::SeqCst) {
                return Err(StorageError::TransactionAborted("injected failure".into()).into());
            }
            let changed = *rows != scratch;
            *rows = scratch;
            changed
        };
        if changed {
            self.notifier.notify(&[CALENDAR_EVENTS_TABLE]);
        }
        Ok(changed)
    }

    async fn before_query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let delay = *self.query_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn by_start(a: &CalendarEvent, b: &CalendarEvent) -> std::cmp::Ordering {
    a.start_date
        .cmp(&b.start_date)
        .then_with(|| a.start_time.cmp(&b.start_time))
        .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl CalendarEventStore for MockCalendarEventStore {
    async fn upsert_batch(&self, events: Vec<CalendarEvent>) -> DomainResult<()> {
        self.commit(|rows| {
            for event in events {
                rows.insert(event.id.clone(), event);
            }
            Ok(())
        })
        .map(|_| ())
    }

    async fn delete_all(&self) -> DomainResult<()> {
        self.commit(|rows| {
            rows.clear();
            Ok(())
        })
        .map(|_| ())
    }

    async fn delete_by_partition(&self, calendar_id: &str) -> DomainResult<()> {
        self.commit(|rows| {
            rows.retain(|_, e| e.calendar_id != calendar_id);
            Ok(())
        })
        .map(|_| ())
    }

    async fn replace_partition(
        &self,
        calendar_id: &str,
        events: Vec<CalendarEvent>,
    ) -> DomainResult<PartitionReplacement> {
        let mut replacement = PartitionReplacement::default();
        self.commit(|rows| {
            let before = rows.len();
            rows.retain(|_, e| e.calendar_id != calendar_id);
            replacement.removed = before - rows.len();
            for event in events {
                if let Some(existing) = rows.get(&event.id) {
                    return Err(StorageError::TransactionAborted(format!(
                        "event {} is owned by calendar {}",
                        event.id, existing.calendar_id
                    ))
                    .into());
                }
                rows.insert(event.id.clone(), event);
            }
            replacement.written = rows.values().filter(|e| e.calendar_id == calendar_id).count();
            Ok(())
        })?;
        Ok(replacement)
    }

    async fn query_range(&self, from: NaiveDate, to: NaiveDate) -> DomainResult<Vec<CalendarEvent>> {
        let query = RangeQuery::range(from, to)?;
        self.before_query().await;
        let mut events: Vec<_> =
            self.rows.lock().values().filter(|e| query.matches(e)).cloned().collect();
        events.sort_by(by_start);
        Ok(events)
    }

    async fn query_date(&self, date: NaiveDate) -> DomainResult<Vec<CalendarEvent>> {
        let query = RangeQuery::date(date);
        self.before_query().await;
        let mut events: Vec<_> =
            self.rows.lock().values().filter(|e| query.matches(e)).cloned().collect();
        events.sort_by(|a, b| {
            b.is_all_day
                .cmp(&a.is_all_day)
                .then_with(|| a.start_time.cmp(&b.start_time))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(events)
    }

    async fn events_in_partition(&self, calendar_id: &str) -> DomainResult<Vec<CalendarEvent>> {
        Ok(self.rows.lock().values().filter(|e| e.belongs_to(calendar_id)).cloned().collect())
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(self.rows.lock().len() as u64)
    }
}

/// Scripted `RemoteCalendarSource`.
#[derive(Clone, Default)]
pub struct MockRemoteCalendarSource {
    calendars: Arc<Mutex<Vec<RemoteCalendar>>>,
    events: Arc<Mutex<HashMap<String, Vec<CalendarEvent>>>>,
    failures: Arc<Mutex<HashMap<String, RemoteError>>>,
    list_failure: Arc<Mutex<Option<RemoteError>>>,
    windows: Arc<Mutex<Vec<DateRange>>>,
}

impl MockRemoteCalendarSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a calendar and the snapshot the provider returns for it.
    pub fn set_calendar(&self, calendar_id: &str, events: Vec<CalendarEvent>) {
        let mut calendars = self.calendars.lock();
        if !calendars.iter().any(|c| c.id == calendar_id) {
            calendars.push(RemoteCalendar::new(calendar_id, calendar_id));
        }
        self.events.lock().insert(calendar_id.to_string(), events);
        self.failures.lock().remove(calendar_id);
    }

    pub fn fail_calendar(&self, calendar_id: &str, error: RemoteError) {
        self.failures.lock().insert(calendar_id.to_string(), error);
    }

    pub fn fail_listing(&self, error: RemoteError) {
        *self.list_failure.lock() = Some(error);
    }

    /// Windows passed to `fetch_calendar_events`, in call order.
    pub fn requested_windows(&self) -> Vec<DateRange> {
        self.windows.lock().clone()
    }
}

#[async_trait]
impl RemoteCalendarSource for MockRemoteCalendarSource {
    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>, RemoteError> {
        if let Some(error) = self.list_failure.lock().clone() {
            return Err(error);
        }
        Ok(self.calendars.lock().clone())
    }

    async fn fetch_calendar_events(
        &self,
        calendar_id: &str,
        window: DateRange,
    ) -> Result<Vec<CalendarEvent>, RemoteError> {
        self.windows.lock().push(window);
        if let Some(error) = self.failures.lock().get(calendar_id).cloned() {
            return Err(error);
        }
        Ok(self.events.lock().get(calendar_id).cloned().unwrap_or_default())
    }
}

/// Wires a notifier, the in-memory store and a scripted remote together.
pub struct Harness {
    pub notifier: Arc<ChangeNotifier>,
    pub store: MockCalendarEventStore,
    pub remote: MockRemoteCalendarSource,
}

impl Harness {
    pub fn new() -> Self {
        let notifier = Arc::new(ChangeNotifier::new());
        let store = MockCalendarEventStore::new(Arc::clone(&notifier));
        Self { notifier, store, remote: MockRemoteCalendarSource::new() }
    }

    pub fn store_port(&self) -> Arc<dyn CalendarEventStore> {
        Arc::new(self.store.clone())
    }

    pub fn remote_port(&self) -> Arc<dyn RemoteCalendarSource> {
        Arc::new(self.remote.clone())
    }
}

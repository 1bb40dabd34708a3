#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use dagplanner_core::{CalendarEventStore, ChangeNotifier, RemoteCalendarSource};
use dagplanner_domain::{CalendarEvent, DateRange, RemoteCalendar, RemoteError};
use dagplanner_infra::database::{DbManager, SqliteCalendarEventStore};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    pub notifier: Arc<ChangeNotifier>,
    pub store: Arc<SqliteCalendarEventStore>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new temporary database with default configuration.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager = DbManager::open(temp_dir.path().join("calendar.db"), Default::default())
            .expect("db manager should be created");
        let manager = Arc::new(manager);
        let notifier = Arc::new(ChangeNotifier::new());
        let store =
            Arc::new(SqliteCalendarEventStore::new(Arc::clone(&manager), Arc::clone(&notifier)));

        Self { manager, notifier, store, _temp_dir: temp_dir }
    }

    pub fn store_port(&self) -> Arc<dyn CalendarEventStore> {
        self.store.clone()
    }

    /// Execute a batch of SQL statements against the database.
    pub fn execute_batch(&self, sql: &str) {
        let conn = self
            .manager
            .get_connection()
            .expect("connection should be available for execute_batch");
        conn.execute_batch(sql).expect("SQL batch execution should succeed");
    }

    /// Make every insert of `event_id` abort the surrounding transaction.
    pub fn poison_event(&self, event_id: &str) {
        self.execute_batch(&format!(
            "CREATE TRIGGER poison_{event_id} BEFORE INSERT ON calendar_events
             WHEN NEW.id = '{event_id}'
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END;"
        ));
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

type Snapshot = Result<Vec<CalendarEvent>, RemoteError>;

/// In-memory provider returning whole calendar snapshots.
#[derive(Default)]
pub struct FakeRemote {
    calendars: Mutex<BTreeMap<String, (RemoteCalendar, Snapshot)>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_calendar(&self, calendar_id: &str, events: Vec<CalendarEvent>) {
        self.calendars.lock().insert(
            calendar_id.to_string(),
            (RemoteCalendar::new(calendar_id, calendar_id), Ok(events)),
        );
    }

    pub fn fail_calendar(&self, calendar_id: &str, error: RemoteError) {
        self.calendars.lock().insert(
            calendar_id.to_string(),
            (RemoteCalendar::new(calendar_id, calendar_id), Err(error)),
        );
    }
}

#[async_trait]
impl RemoteCalendarSource for FakeRemote {
    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>, RemoteError> {
        Ok(self.calendars.lock().values().map(|(calendar, _)| calendar.clone()).collect())
    }

    async fn fetch_calendar_events(
        &self,
        calendar_id: &str,
        _window: DateRange,
    ) -> Result<Vec<CalendarEvent>, RemoteError> {
        self.calendars
            .lock()
            .get(calendar_id)
            .map(|(_, snapshot)| snapshot.clone())
            .unwrap_or_else(|| Err(RemoteError::Unknown(format!("no calendar {calendar_id}"))))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

pub fn all_day(id: &str, calendar_id: &str, day: NaiveDate) -> CalendarEvent {
    CalendarEvent::all_day(id, calendar_id, format!("{id} title"), day)
        .with_calendar_name(calendar_id)
}

pub fn timed(id: &str, calendar_id: &str, day: NaiveDate, hour: u32) -> CalendarEvent {
    let title = format!("{id} title");
    CalendarEvent::timed(id, calendar_id, title, day, time(hour, 0), time(hour + 1, 0))
        .with_calendar_name(calendar_id)
}

//! SQLite implementation of the `CalendarEventStore` port.
//!
//! Writes run in `BEGIN IMMEDIATE` transactions behind an in-process write
//! gate, and the change notifier is signalled while the gate is still held,
//! so notification order equals commit order. Reads go straight to the pool;
//! in WAL mode they never wait for the writer.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dagplanner_core::{CalendarEventStore, ChangeNotifier, PartitionReplacement};
use dagplanner_domain::constants::CALENDAR_EVENTS_TABLE;
use dagplanner_domain::{CalendarEvent, DagPlannerError, DateRange, Result, StorageError};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tokio::task;
use tracing::{debug, instrument};

use super::manager::DbManager;
use crate::errors::{map_join_error, InfraError};

const EVENT_COLUMNS: &str = "id, calendar_id, title, description, location, start_date, \
     start_time, end_date, end_time, is_all_day, color_hex, calendar_name, is_recurring, html_link";

const UPSERT_SQL: &str = "INSERT INTO calendar_events (
        id, calendar_id, title, description, location, start_date, start_time,
        end_date, end_time, is_all_day, color_hex, calendar_name, is_recurring, html_link
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
    ON CONFLICT(id) DO UPDATE SET
        calendar_id = excluded.calendar_id,
        title = excluded.title,
        description = excluded.description,
        location = excluded.location,
        start_date = excluded.start_date,
        start_time = excluded.start_time,
        end_date = excluded.end_date,
        end_time = excluded.end_time,
        is_all_day = excluded.is_all_day,
        color_hex = excluded.color_hex,
        calendar_name = excluded.calendar_name,
        is_recurring = excluded.is_recurring,
        html_link = excluded.html_link";

/// SQLite-backed event store
pub struct SqliteCalendarEventStore {
    db: Arc<DbManager>,
    notifier: Arc<ChangeNotifier>,
    write_gate: Arc<Mutex<()>>,
}

impl SqliteCalendarEventStore {
    /// Create a new store that signals `notifier` after each commit
    pub fn new(db: Arc<DbManager>, notifier: Arc<ChangeNotifier>) -> Self {
        Self { db, notifier, write_gate: Arc::new(Mutex::new(())) }
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Run `op` inside one immediate transaction on the blocking pool.
    ///
    /// `op` returns the value plus whether any row changed; the notifier is
    /// only signalled for committed changes.
    async fn write<T, F>(&self, operation: &'static str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<(T, bool)> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let notifier = Arc::clone(&self.notifier);
        let gate = Arc::clone(&self.write_gate);

        task::spawn_blocking(move || -> Result<T> {
            let _gate = gate.lock();
            let mut conn = db.get_connection()?;
            let tx = conn.transaction_immediate().map_err(InfraError::from)?;

            let (value, changed) = op(&tx)?;
            tx.commit().map_err(InfraError::from)?;

            if changed {
                let generation = notifier.notify(&[CALENDAR_EVENTS_TABLE]);
                debug!(operation, generation, "committed calendar change");
            }
            Ok(value)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn read<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<T> {
            let conn = db.get_connection()?;
            op(&*conn)
        })
        .await
        .map_err(map_join_error)?
    }
}

impl std::fmt::Debug for SqliteCalendarEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCalendarEventStore").field("db", &self.db.path()).finish()
    }
}

fn map_event_row(row: &Row<'_>) -> rusqlite::Result<CalendarEvent> {
    Ok(CalendarEvent {
        id: row.get(0)?,
        calendar_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        location: row.get(4)?,
        start_date: row.get(5)?,
        start_time: row.get(6)?,
        end_date: row.get(7)?,
        end_time: row.get(8)?,
        is_all_day: row.get(9)?,
        color_hex: row.get(10)?,
        calendar_name: row.get(11)?,
        is_recurring: row.get(12)?,
        html_link: row.get(13)?,
    })
}

fn upsert_events(tx: &Transaction<'_>, events: &[CalendarEvent]) -> Result<usize> {
    let mut stmt = tx.prepare_cached(UPSERT_SQL).map_err(InfraError::from)?;
    for event in events {
        stmt.execute(params![
            event.id,
            event.calendar_id,
            event.title,
            event.description,
            event.location,
            event.start_date,
            event.start_time,
            event.end_date,
            event.end_time,
            event.is_all_day,
            event.color_hex,
            event.calendar_name,
            event.is_recurring,
            event.html_link,
        ])
        .map_err(InfraError::from)?;
    }
    Ok(events.len())
}

fn select_events(
    conn: &Connection,
    sql_tail: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<CalendarEvent>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM calendar_events {sql_tail}");
    let mut stmt = conn.prepare_cached(&sql).map_err(InfraError::from)?;
    let rows = stmt
        .query_map(params, map_event_row)
        .map_err(InfraError::from)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(InfraError::from)?;
    Ok(rows)
}

fn partition_size(conn: &Connection, calendar_id: &str) -> Result<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM calendar_events WHERE calendar_id = ?1",
            params![calendar_id],
            |row| row.get(0),
        )
        .map_err(InfraError::from)?;
    Ok(usize::try_from(count).unwrap_or_default())
}

#[async_trait]
impl CalendarEventStore for SqliteCalendarEventStore {
    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn upsert_batch(&self, events: Vec<CalendarEvent>) -> Result<()> {
        self.write("upsert_batch", move |tx| {
            let written = upsert_events(tx, &events)?;
            Ok(((), written > 0))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_all(&self) -> Result<()> {
        self.write("delete_all", |tx| {
            let removed = tx.execute("DELETE FROM calendar_events", []).map_err(InfraError::from)?;
            debug!(removed, "deleted all calendar events");
            Ok(((), removed > 0))
        })
        .await
    }

    #[instrument(skip(self), fields(calendar_id = %calendar_id))]
    async fn delete_by_partition(&self, calendar_id: &str) -> Result<()> {
        let calendar_id = calendar_id.to_string();
        self.write("delete_by_partition", move |tx| {
            let removed = tx
                .execute("DELETE FROM calendar_events WHERE calendar_id = ?1", params![calendar_id])
                .map_err(InfraError::from)?;
            debug!(removed, "deleted calendar partition");
            Ok(((), removed > 0))
        })
        .await
    }

    #[instrument(skip(self, events), fields(calendar_id = %calendar_id, count = events.len()))]
    async fn replace_partition(
        &self,
        calendar_id: &str,
        events: Vec<CalendarEvent>,
    ) -> Result<PartitionReplacement> {
        if let Some(foreign) = events.iter().find(|e| !e.belongs_to(calendar_id)) {
            return Err(DagPlannerError::InvalidSnapshot(format!(
                "event {} belongs to calendar {}, expected {calendar_id}",
                foreign.id, foreign.calendar_id
            )));
        }

        let calendar_id = calendar_id.to_string();
        self.write("replace_partition", move |tx| {
            let removed = tx
                .execute("DELETE FROM calendar_events WHERE calendar_id = ?1", params![calendar_id])
                .map_err(InfraError::from)?;

            for event in &events {
                let owner: Option<String> = tx
                    .query_row(
                        "SELECT calendar_id FROM calendar_events WHERE id = ?1",
                        params![event.id],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(InfraError::from)?;
                if let Some(owner) = owner.filter(|owner| *owner != calendar_id) {
                    return Err(StorageError::TransactionAborted(format!(
                        "event {} is owned by calendar {owner}",
                        event.id
                    ))
                    .into());
                }
            }

            upsert_events(tx, &events)?;
            let written = partition_size(tx, &calendar_id)?;
            let replacement = PartitionReplacement { removed, written };
            Ok((replacement, !replacement.is_noop()))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn query_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CalendarEvent>> {
        let range = DateRange::new(from, to)?;
        self.read(move |conn| {
            select_events(
                conn,
                "WHERE start_date BETWEEN ?1 AND ?2 \
                 ORDER BY start_date ASC, start_time ASC, id ASC",
                params![range.from(), range.to()],
            )
        })
        .await
    }

    #[instrument(skip(self))]
    async fn query_date(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>> {
        self.read(move |conn| {
            select_events(
                conn,
                "WHERE start_date = ?1 ORDER BY is_all_day DESC, start_time ASC, id ASC",
                params![date],
            )
        })
        .await
    }

    #[instrument(skip(self), fields(calendar_id = %calendar_id))]
    async fn events_in_partition(&self, calendar_id: &str) -> Result<Vec<CalendarEvent>> {
        let calendar_id = calendar_id.to_string();
        self.read(move |conn| {
            select_events(conn, "WHERE calendar_id = ?1 ORDER BY id ASC", params![calendar_id])
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        self.read(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM calendar_events", [], |row| row.get(0))
                .map_err(InfraError::from)?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use dagplanner_common::storage::SqlitePoolConfig;
    use tempfile::TempDir;

    use super::*;

    fn store(dir: &TempDir) -> SqliteCalendarEventStore {
        let db = DbManager::open(dir.path().join("store.db"), SqlitePoolConfig::default()).unwrap();
        SqliteCalendarEventStore::new(Arc::new(db), Arc::new(ChangeNotifier::new()))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn every_field_survives_storage() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let event = CalendarEvent::timed(
            "work_abc",
            "work",
            "Planning",
            date(2024, 2, 29),
            NaiveTime::from_hms_milli_opt(9, 15, 0, 250).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
        .with_description("Quarterly")
        .with_location("Room 4")
        .with_color("#7986CB")
        .with_calendar_name("Work")
        .with_end_date(date(2024, 3, 1))
        .recurring(true);

        store.upsert_batch(vec![event.clone()]).await.unwrap();

        assert_eq!(store.events_in_partition("work").await.unwrap(), vec![event]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_ids_in_a_batch_keep_the_last() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let first = CalendarEvent::all_day("e1", "work", "First", date(2024, 1, 1));
        let second = CalendarEvent::all_day("e1", "work", "Second", date(2024, 1, 2));

        store.upsert_batch(vec![first, second.clone()]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.events_in_partition("work").await.unwrap(), vec![second]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_writes_do_not_notify() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.upsert_batch(Vec::new()).await.unwrap();
        store.delete_all().await.unwrap();
        store.delete_by_partition("work").await.unwrap();

        assert_eq!(store.notifier().generation(), 0);
    }
}

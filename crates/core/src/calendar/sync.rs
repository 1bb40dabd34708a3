//! Sync reconciler - mirrors remote calendars into the local store
//!
//! The remote provider is the source of truth per calendar. Each sync fetches
//! the complete snapshot of one calendar and replaces the local partition in
//! a single store transaction. A failed fetch leaves local data untouched.

use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use dagplanner_domain::constants::{DEFAULT_SYNC_LOOKAHEAD_MONTHS, DEFAULT_SYNC_LOOKBACK_MONTHS};
use dagplanner_domain::{DagPlannerError, DateRange, Result, SyncConfig};
use tracing::{error, info, instrument, warn};

use super::ports::{CalendarEventStore, RemoteCalendarSource};

/// Window of dates fetched from the provider, relative to the current month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub lookback_months: u32,
    pub lookahead_months: u32,
}

impl Default for SyncWindow {
    fn default() -> Self {
        Self {
            lookback_months: DEFAULT_SYNC_LOOKBACK_MONTHS,
            lookahead_months: DEFAULT_SYNC_LOOKAHEAD_MONTHS,
        }
    }
}

impl From<&SyncConfig> for SyncWindow {
    fn from(config: &SyncConfig) -> Self {
        Self { lookback_months: config.lookback_months, lookahead_months: config.lookahead_months }
    }
}

impl SyncWindow {
    /// Dates covered when syncing on `today`.
    ///
    /// Spans from the first of the current month minus `lookback_months` to
    /// the first of the current month plus `lookahead_months`.
    pub fn range_for(&self, today: NaiveDate) -> Result<DateRange> {
        let month_start = today.with_day(1).ok_or_else(|| out_of_range(today))?;
        let from = month_start
            .checked_sub_months(Months::new(self.lookback_months))
            .ok_or_else(|| out_of_range(today))?;
        let to = month_start
            .checked_add_months(Months::new(self.lookahead_months))
            .ok_or_else(|| out_of_range(today))?;
        DateRange::new(from, to)
    }
}

fn out_of_range(today: NaiveDate) -> DagPlannerError {
    DagPlannerError::Internal(format!("sync window around {today} is out of range"))
}

/// Outcome of one committed partition sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub calendar_id: String,
    /// Events in the remote snapshot
    pub fetched: usize,
    /// Local rows dropped by the replacement
    pub removed: usize,
    /// Rows in the partition afterwards
    pub written: usize,
    pub window: DateRange,
}

/// A calendar whose sync failed; its partition was left as it was
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub calendar_id: String,
    pub error: DagPlannerError,
}

/// Outcome of [`SyncReconciler::sync_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub reports: Vec<SyncReport>,
    pub failures: Vec<SyncFailure>,
}

impl SyncSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_written(&self) -> usize {
        self.reports.iter().map(|r| r.written).sum()
    }

    pub fn total_removed(&self) -> usize {
        self.reports.iter().map(|r| r.removed).sum()
    }
}

type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

fn today_in(tz: Tz) -> Today {
    Arc::new(move || Utc::now().with_timezone(&tz).date_naive())
}

/// Replaces local partitions with complete remote snapshots
pub struct SyncReconciler {
    store: Arc<dyn CalendarEventStore>,
    remote: Arc<dyn RemoteCalendarSource>,
    window: SyncWindow,
    today: Today,
}

impl SyncReconciler {
    /// Create a reconciler using the default window and today's date in UTC.
    pub fn new(store: Arc<dyn CalendarEventStore>, remote: Arc<dyn RemoteCalendarSource>) -> Self {
        Self { store, remote, window: SyncWindow::default(), today: today_in(Tz::UTC) }
    }

    /// Create a reconciler with the window and time zone of `config`.
    ///
    /// # Errors
    /// [`DagPlannerError::Config`] if `config.time_zone` is not a valid zone.
    pub fn from_config(
        store: Arc<dyn CalendarEventStore>,
        remote: Arc<dyn RemoteCalendarSource>,
        config: &SyncConfig,
    ) -> Result<Self> {
        let tz = config.tz()?;
        Ok(Self::new(store, remote).with_window(SyncWindow::from(config)).with_time_zone(tz))
    }

    #[must_use]
    pub fn with_window(mut self, window: SyncWindow) -> Self {
        self.window = window;
        self
    }

    /// Take the current date from the wall clock in `tz`.
    #[must_use]
    pub fn with_time_zone(mut self, tz: Tz) -> Self {
        self.today = today_in(tz);
        self
    }

    /// Override how the current date is determined.
    #[must_use]
    pub fn with_today<F>(mut self, today: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.today = Arc::new(today);
        self
    }

    pub fn window(&self) -> SyncWindow {
        self.window
    }

    /// Fetch one calendar and replace its local partition.
    ///
    /// # Errors
    /// - [`DagPlannerError::Remote`] if the fetch fails; nothing is mutated.
    /// - [`DagPlannerError::InvalidSnapshot`] if the snapshot carries events of
    ///   another calendar; nothing is mutated.
    /// - [`DagPlannerError::Storage`] if the replacement transaction fails; the
    ///   previous partition contents stay intact.
    #[instrument(skip(self), fields(calendar_id = %calendar_id))]
    pub async fn sync_calendar(&self, calendar_id: &str) -> Result<SyncReport> {
        let window = self.window.range_for((self.today)())?;

        let events = self.remote.fetch_calendar_events(calendar_id, window).await.map_err(|err| {
            warn!(error = %err, retryable = err.is_retryable(), "remote fetch failed");
            DagPlannerError::from(err)
        })?;

        if let Some(foreign) = events.iter().find(|e| !e.belongs_to(calendar_id)) {
            return Err(DagPlannerError::InvalidSnapshot(format!(
                "event {} belongs to calendar {}, expected {calendar_id}",
                foreign.id, foreign.calendar_id
            )));
        }

        let fetched = events.len();
        let replacement = self.store.replace_partition(calendar_id, events).await?;

        info!(
            fetched,
            removed = replacement.removed,
            written = replacement.written,
            "calendar partition replaced"
        );

        Ok(SyncReport {
            calendar_id: calendar_id.to_string(),
            fetched,
            removed: replacement.removed,
            written: replacement.written,
            window,
        })
    }

    /// Sync every calendar the provider lists.
    ///
    /// Calendars are reconciled independently: one failure neither stops the
    /// others nor touches their partitions.
    ///
    /// # Errors
    /// Returns [`DagPlannerError::Remote`] if the calendar list cannot be
    /// fetched; nothing is mutated in that case.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> Result<SyncSummary> {
        let calendars = self.remote.list_calendars().await?;
        let mut summary = SyncSummary::default();

        for calendar in calendars {
            match self.sync_calendar(&calendar.id).await {
                Ok(report) => summary.reports.push(report),
                Err(err) => {
                    error!(
                        calendar_id = %calendar.id,
                        error = %err,
                        kind = err.label(),
                        "calendar sync failed"
                    );
                    summary.failures.push(SyncFailure { calendar_id: calendar.id, error: err });
                }
            }
        }

        info!(
            synced = summary.reports.len(),
            failed = summary.failures.len(),
            written = summary.total_written(),
            "sync finished"
        );
        Ok(summary)
    }

    /// Drop every cached event, e.g. on sign-out.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<()> {
        self.store.delete_all().await?;
        info!("calendar cache reset");
        Ok(())
    }
}

impl std::fmt::Debug for SyncReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncReconciler").field("window", &self.window).finish_non_exhaustive()
    }
}

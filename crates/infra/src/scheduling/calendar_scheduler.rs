//! Calendar synchronization scheduler for periodic event sync.
//!
//! Runs [`SyncReconciler::sync_all`] on a cron schedule. Join handles are
//! tracked, cancellation is explicit, and every asynchronous operation is
//! wrapped in a timeout. A failed or timed-out run is logged and retried on
//! the next tick; no retry happens in between.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dagplanner_core::SyncReconciler;
//! use dagplanner_domain::SyncConfig;
//! use dagplanner_infra::scheduling::{CalendarSyncScheduler, SchedulerResult};
//!
//! # async fn example(reconciler: Arc<SyncReconciler>) -> SchedulerResult<()> {
//! let mut scheduler = CalendarSyncScheduler::new(reconciler, &SyncConfig::default());
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dagplanner_core::{SyncReconciler, SyncSummary};
use dagplanner_domain::SyncConfig;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the calendar sync scheduler.
#[derive(Debug, Clone)]
pub struct CalendarSyncSchedulerConfig {
    /// Six-field cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Timeout applied to a single sync execution.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for CalendarSyncSchedulerConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for CalendarSyncSchedulerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            cron_expression: config.cron_expression.clone(),
            job_timeout: Duration::from_secs(config.job_timeout_secs.max(1)),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Counters of scheduled and manual runs.
#[derive(Debug, Default)]
pub struct SyncRunStats {
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

impl SyncRunStats {
    /// Runs whose every calendar synced.
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Acquire)
    }

    /// Runs that errored or left at least one calendar unsynced.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u64 {
        self.succeeded() + self.failed() + self.timed_out()
    }
}

/// Cron-driven background sync with explicit lifecycle management.
pub struct CalendarSyncScheduler {
    scheduler: Option<JobScheduler>,
    job_id: Option<Uuid>,
    config: CalendarSyncSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    reconciler: Arc<SyncReconciler>,
    stats: Arc<SyncRunStats>,
}

impl CalendarSyncScheduler {
    /// Create a scheduler from the sync section of the configuration.
    pub fn new(reconciler: Arc<SyncReconciler>, sync: &SyncConfig) -> Self {
        Self::with_config(CalendarSyncSchedulerConfig::from(sync), reconciler)
    }

    /// Create a scheduler with a custom configuration.
    pub fn with_config(
        config: CalendarSyncSchedulerConfig,
        reconciler: Arc<SyncReconciler>,
    ) -> Self {
        Self {
            scheduler: None,
            job_id: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            reconciler,
            stats: Arc::new(SyncRunStats::default()),
        }
    }

    pub fn config(&self) -> &CalendarSyncSchedulerConfig {
        &self.config
    }

    pub fn stats(&self) -> &SyncRunStats {
        &self.stats
    }

    /// Start the scheduler, spawning the monitoring task.
    ///
    /// # Errors
    /// [`SchedulerError::AlreadyRunning`] on a second start, and
    /// [`SchedulerError::JobRegistrationFailed`] for an invalid cron expression.
    #[instrument(skip(self), fields(cron = %self.config.cron_expression))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let (scheduler_instance, job_id) = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StartFailed(e.to_string()))?;

        self.scheduler = Some(scheduler_instance);
        self.job_id = Some(job_id);

        let cancel = self.cancellation.clone();
        let stats = self.stats.clone();
        self.monitor_handle = Some(tokio::spawn(async move {
            Self::monitor_task(cancel, stats).await;
        }));

        info!(job_id = %job_id, "Calendar sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(mut scheduler) = self.scheduler.take() else {
            return Err(SchedulerError::NotRunning);
        };

        self.cancellation.cancel();
        self.job_id = None;

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StopFailed(e.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("Calendar sync scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Identifier of the registered cron job while running.
    pub fn job_id(&self) -> Option<Uuid> {
        self.job_id
    }

    /// Trigger one sync immediately, independent of the schedule.
    ///
    /// # Errors
    /// [`SchedulerError::Timeout`] if the run exceeds the job timeout;
    /// [`SchedulerError::Sync`] if the calendar list could not be fetched.
    /// Per-calendar failures are reported inside the summary.
    pub async fn run_once(&self) -> SchedulerResult<SyncSummary> {
        Self::run_sync(self.reconciler.clone(), self.stats.clone(), self.config.job_timeout).await
    }

    async fn build_scheduler(&self) -> SchedulerResult<(JobScheduler, Uuid)> {
        let scheduler =
            JobScheduler::new().await.map_err(|e| SchedulerError::CreationFailed(e.to_string()))?;
        let reconciler = self.reconciler.clone();
        let stats = self.stats.clone();
        let job_timeout = self.config.job_timeout;

        let job_definition =
            Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
                let reconciler = reconciler.clone();
                let stats = stats.clone();

                Box::pin(async move {
                    // Outcome is logged and counted inside run_sync.
                    let _ = Self::run_sync(reconciler, stats, job_timeout).await;
                })
            })
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        let job_id = job_definition.guid();
        scheduler
            .add(job_definition)
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "Registered calendar sync job");
        Ok((scheduler, job_id))
    }

    async fn run_sync(
        reconciler: Arc<SyncReconciler>,
        stats: Arc<SyncRunStats>,
        job_timeout: Duration,
    ) -> SchedulerResult<SyncSummary> {
        let started = Instant::now();

        match tokio::time::timeout(job_timeout, reconciler.sync_all()).await {
            Ok(Ok(summary)) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                if summary.is_success() {
                    stats.succeeded.fetch_add(1, Ordering::AcqRel);
                    debug!(
                        elapsed_ms,
                        calendars = summary.reports.len(),
                        "Calendar sync finished successfully"
                    );
                } else {
                    stats.failed.fetch_add(1, Ordering::AcqRel);
                    warn!(
                        elapsed_ms,
                        failed = summary.failures.len(),
                        synced = summary.reports.len(),
                        "Calendar sync finished with failures"
                    );
                }
                Ok(summary)
            }
            Ok(Err(err)) => {
                stats.failed.fetch_add(1, Ordering::AcqRel);
                error!(error = %err, kind = err.label(), "Calendar sync failed");
                Err(SchedulerError::Sync(err))
            }
            Err(_) => {
                stats.timed_out.fetch_add(1, Ordering::AcqRel);
                warn!(timeout_secs = job_timeout.as_secs(), "Calendar sync timed out");
                Err(SchedulerError::Timeout { seconds: job_timeout.as_secs() })
            }
        }
    }

    async fn monitor_task(cancel: CancellationToken, stats: Arc<SyncRunStats>) {
        cancel.cancelled().await;
        debug!(
            succeeded = stats.succeeded(),
            failed = stats.failed(),
            timed_out = stats.timed_out(),
            "Calendar sync scheduler monitor cancelled"
        );
    }
}

impl std::fmt::Debug for CalendarSyncScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarSyncScheduler")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Drop for CalendarSyncScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("CalendarSyncScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use dagplanner_core::{ChangeNotifier, RemoteCalendarSource};
    use dagplanner_domain::{CalendarEvent, DateRange, RemoteCalendar, RemoteError};
    use tempfile::TempDir;

    use super::*;
    use crate::database::{DbManager, SqliteCalendarEventStore};

    #[derive(Default)]
    struct StubRemote {
        offline: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl RemoteCalendarSource for StubRemote {
        async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>, RemoteError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.offline {
                return Err(RemoteError::NetworkUnavailable("offline".into()));
            }
            Ok(vec![RemoteCalendar::new("work", "Work")])
        }

        async fn fetch_calendar_events(
            &self,
            calendar_id: &str,
            _window: DateRange,
        ) -> Result<Vec<CalendarEvent>, RemoteError> {
            let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
            Ok(vec![CalendarEvent::all_day("work_1", calendar_id, "Offsite", day)])
        }
    }

    fn build(
        dir: &TempDir,
        remote: StubRemote,
        config: CalendarSyncSchedulerConfig,
    ) -> CalendarSyncScheduler {
        let db = Arc::new(DbManager::open(dir.path().join("sync.db"), Default::default()).unwrap());
        let store = Arc::new(SqliteCalendarEventStore::new(db, Arc::new(ChangeNotifier::new())));
        let reconciler = Arc::new(SyncReconciler::new(store, Arc::new(remote)));
        CalendarSyncScheduler::with_config(config, reconciler)
    }

    fn every_second() -> CalendarSyncSchedulerConfig {
        CalendarSyncSchedulerConfig {
            cron_expression: "*/1 * * * * *".into(),
            ..CalendarSyncSchedulerConfig::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_runs_scheduled_syncs() {
        let dir = TempDir::new().unwrap();
        let mut scheduler = build(&dir, StubRemote::default(), every_second());

        scheduler.start().await.unwrap();
        assert!(scheduler.is_running());
        assert!(scheduler.job_id().is_some());
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.stop().await.unwrap();

        assert!(!scheduler.is_running());
        assert_eq!(scheduler.job_id(), None);
        assert!(scheduler.stats().succeeded() >= 1, "{:?}", scheduler.stats());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_and_idle_stop_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut scheduler = build(&dir, StubRemote::default(), every_second());

        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));

        scheduler.start().await.unwrap();
        assert!(matches!(scheduler.start().await, Err(SchedulerError::AlreadyRunning)));
        scheduler.stop().await.unwrap();

        scheduler.start().await.unwrap();
        scheduler.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_cron_fails_to_register() {
        let dir = TempDir::new().unwrap();
        let config = CalendarSyncSchedulerConfig {
            cron_expression: "every now and then".into(),
            ..CalendarSyncSchedulerConfig::default()
        };
        let mut scheduler = build(&dir, StubRemote::default(), config);

        let err = scheduler.start().await.unwrap_err();

        assert!(matches!(err, SchedulerError::JobRegistrationFailed(_)));
        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_once_reports_summary_and_failures() {
        let dir = TempDir::new().unwrap();
        let scheduler = build(&dir, StubRemote::default(), CalendarSyncSchedulerConfig::default());

        let summary = scheduler.run_once().await.unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.total_written(), 1);

        let offline_dir = TempDir::new().unwrap();
        let offline = StubRemote { offline: true, ..StubRemote::default() };
        let offline = build(&offline_dir, offline, CalendarSyncSchedulerConfig::default());
        assert!(matches!(offline.run_once().await, Err(SchedulerError::Sync(_))));
        assert_eq!(offline.stats().failed(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slow_runs_time_out() {
        let dir = TempDir::new().unwrap();
        let remote = StubRemote { delay: Some(Duration::from_secs(5)), ..StubRemote::default() };
        let config = CalendarSyncSchedulerConfig {
            job_timeout: Duration::from_millis(50),
            ..CalendarSyncSchedulerConfig::default()
        };
        let scheduler = build(&dir, remote, config);

        assert!(matches!(scheduler.run_once().await, Err(SchedulerError::Timeout { .. })));
        assert_eq!(scheduler.stats().timed_out(), 1);
    }

    #[test]
    fn config_follows_sync_settings() {
        let sync = SyncConfig { job_timeout_secs: 42, ..SyncConfig::default() };
        let config = CalendarSyncSchedulerConfig::from(&sync);
        assert_eq!(config.cron_expression, "0 */15 * * * *");
        assert_eq!(config.job_timeout, Duration::from_secs(42));
    }
}

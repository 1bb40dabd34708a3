//! Configuration management

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SYNC_LOOKAHEAD_MONTHS, DEFAULT_SYNC_LOOKBACK_MONTHS};
use crate::errors::{DagPlannerError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Check values serde can't: currently the sync time zone.
    ///
    /// # Errors
    /// [`DagPlannerError::Config`] naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.sync.tz().map(|_| ())
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
    pub enable_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "dagplanner.db".to_string(),
            pool_size: 4,
            busy_timeout_ms: 5000,
            enable_wal: true,
        }
    }
}

/// Background sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    /// Six-field cron expression (seconds first)
    pub cron_expression: String,
    pub lookback_months: u32,
    pub lookahead_months: u32,
    pub job_timeout_secs: u64,
    /// IANA zone used to turn provider timestamps into local dates
    pub time_zone: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron_expression: "0 */15 * * * *".to_string(),
            lookback_months: DEFAULT_SYNC_LOOKBACK_MONTHS,
            lookahead_months: DEFAULT_SYNC_LOOKAHEAD_MONTHS,
            job_timeout_secs: 300,
            time_zone: "UTC".to_string(),
        }
    }
}

impl SyncConfig {
    /// Parsed [`SyncConfig::time_zone`].
    ///
    /// # Errors
    /// [`DagPlannerError::Config`] if the name is not an IANA zone.
    pub fn tz(&self) -> Result<Tz> {
        self.time_zone.trim().parse::<Tz>().map_err(|e| {
            DagPlannerError::Config(format!("Invalid sync time zone {:?}: {e}", self.time_zone))
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `RUST_LOG`-style filter directives
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: false }
    }
}

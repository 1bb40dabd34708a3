//! Pool configuration
//!
//! Connection pool sizing, timeouts and per-connection pragma switches.

use std::time::Duration;

use super::error::{PoolError, PoolResult};

/// SQLite pool configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlitePoolConfig {
    /// Maximum number of pooled connections (default: 4)
    pub max_size: u32,

    /// How long to wait for a free connection (default: 5s)
    pub connection_timeout: Duration,

    /// How long SQLite waits on a locked database (default: 5s)
    pub busy_timeout: Duration,

    /// Enable WAL journal mode (default: true)
    pub enable_wal: bool,

    /// Enable foreign key enforcement (default: true)
    pub enable_foreign_keys: bool,
}

impl Default for SqlitePoolConfig {
    fn default() -> Self {
        Self {
            max_size: 4,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl SqlitePoolConfig {
    /// Set the maximum pool size
    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the busy timeout
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Set the connection acquisition timeout
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Enable or disable WAL mode
    #[must_use]
    pub fn with_wal(mut self, enable: bool) -> Self {
        self.enable_wal = enable;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns [`PoolError::InvalidConfig`] when a value is out of range.
    pub fn validate(&self) -> PoolResult<()> {
        if self.max_size == 0 {
            return Err(PoolError::InvalidConfig("max_size must be greater than 0".to_string()));
        }
        if self.max_size > 64 {
            return Err(PoolError::InvalidConfig("max_size too large (max: 64)".to_string()));
        }
        if self.connection_timeout.is_zero() {
            return Err(PoolError::InvalidConfig(
                "connection_timeout must be greater than 0".to_string(),
            ));
        }
        if self.busy_timeout.is_zero() {
            return Err(PoolError::InvalidConfig("busy_timeout must be greater than 0".to_string()));
        }
        Ok(())
    }
}

//! SQLite connection pool
//!
//! r2d2-based pooling for the on-disk cache database. Every connection gets
//! the configured pragmas applied when r2d2 opens it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::config::SqlitePoolConfig;
use super::connection::SqliteConnection;
use super::error::{PoolError, PoolResult};
use super::metrics::PoolMetrics;
use super::pragmas::apply_connection_pragmas;
use super::types::HealthStatus;

/// SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
    config: SqlitePoolConfig,
    metrics: Arc<PoolMetrics>,
}

impl SqlitePool {
    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, the parent directory
    /// cannot be created, or the first connection cannot be opened.
    #[instrument(skip(config), fields(db_path = ?path, pool_size = config.max_size))]
    pub fn open(path: &Path, config: SqlitePoolConfig) -> PoolResult<Self> {
        config.validate()?;
        info!("Creating SQLite connection pool");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let metrics = Arc::new(PoolMetrics::new(config.max_size));
        let pragma_config = config.clone();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            apply_connection_pragmas(conn, &pragma_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!(error = %e, "Failed to create connection pool");
                PoolError::Connection(format!("Failed to create pool: {e}"))
            })?;

        info!("SQLite pool created with {} connections", config.max_size);
        Ok(Self { pool, path: path.to_path_buf(), config, metrics })
    }

    /// Borrow a connection from the pool
    ///
    /// # Errors
    /// Returns [`PoolError::Timeout`] when no connection frees up within the
    /// configured timeout.
    #[instrument(skip(self), fields(pool_size = self.config.max_size))]
    pub fn get_connection(&self) -> PoolResult<SqliteConnection> {
        let start = Instant::now();

        match self.pool.get() {
            Ok(conn) => {
                let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                self.metrics.record_connection_acquired(duration_ms);
                debug!("Connection acquired in {}ms", duration_ms);
                Ok(SqliteConnection::new(conn))
            }
            Err(e) => {
                if e.to_string().to_lowercase().contains("timed out") {
                    self.metrics.record_connection_timeout();
                    warn!("Connection timeout after {:?}", self.config.connection_timeout);
                    Err(PoolError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    self.metrics.record_connection_error();
                    warn!(error = %e, "Connection error");
                    Err(PoolError::Connection(format!("Failed to get connection: {e}")))
                }
            }
        }
    }

    /// Check that a connection can be acquired and answers a trivial query
    pub fn health_check(&self) -> HealthStatus {
        let state = self.pool.state();
        let probe = self
            .get_connection()
            .and_then(|conn| conn.query_row("SELECT 1", &[], |row| row.get::<_, i64>(0)));

        match probe {
            Ok(_) => HealthStatus::healthy(
                (state.connections - state.idle_connections) as usize,
                state.idle_connections as usize,
                self.config.max_size as usize,
            ),
            Err(e) => HealthStatus::unhealthy(format!("Pool unhealthy: {e}")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &SqlitePoolConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<PoolMetrics> {
        &self.metrics
    }
}

//! Database connection manager backed by the shared SQLite pool.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dagplanner_common::storage::{HealthStatus, SqliteConnection, SqlitePool, SqlitePoolConfig};
use dagplanner_domain::{DatabaseConfig, Result};
use tracing::info;

use super::schema::ensure_schema;
use crate::errors::{map_pool_error, InfraError};

/// Database manager that wraps an [`SqlitePool`].
///
/// Construction validates the schema identity, so a live manager always
/// points at a database this build can read.
#[derive(Debug)]
pub struct DbManager {
    pool: Arc<SqlitePool>,
}

impl DbManager {
    /// Open the database described by `config`.
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool_config = SqlitePoolConfig::default()
            .with_max_size(config.pool_size.max(1))
            .with_busy_timeout(Duration::from_millis(config.busy_timeout_ms.max(1)))
            .with_wal(config.enable_wal);
        Self::open(Path::new(&config.path), pool_config)
    }

    /// Open `db_path` with an explicit pool configuration.
    ///
    /// # Errors
    /// [`dagplanner_domain::StorageError::SchemaMismatch`] when the file was
    /// created by an incompatible schema; I/O failures otherwise.
    pub fn open<P: AsRef<Path>>(db_path: P, pool_config: SqlitePoolConfig) -> Result<Self> {
        let pool = SqlitePool::open(db_path.as_ref(), pool_config).map_err(map_pool_error)?;
        let manager = Self { pool: Arc::new(pool) };

        let mut conn = manager.get_connection()?;
        ensure_schema(&mut conn)?;

        info!(
            db_path = %manager.path().display(),
            max_connections = manager.pool.metrics().max_pool_size(),
            "sqlite pool initialised"
        );
        Ok(manager)
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &Arc<SqlitePool> {
        &self.pool
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get_connection().map_err(map_pool_error)
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        self.pool.path()
    }

    /// Verify the database answers a trivial query.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", &[], |row| row.get::<_, i32>(0))
            .map_err(InfraError::from)?;
        Ok(())
    }

    /// Connection pool occupancy and liveness.
    pub fn pool_health(&self) -> HealthStatus {
        self.pool.health_check()
    }
}

//! Temporary SQLite database helpers.
//!
//! Keeps the database file inside a temporary directory so clean-up happens
//! automatically when the test completes.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::storage::{PoolResult, SqliteConnection, SqlitePool, SqlitePoolConfig};

/// Manage the lifetime of a temporary on-disk database for tests.
#[derive(Debug)]
pub struct TestDatabase {
    db_path: PathBuf,
    pool: SqlitePool,
    // Dropped after the pool; removes the file.
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new database using the default pool config.
    pub fn new() -> PoolResult<Self> {
        Self::with_pool_config(SqlitePoolConfig::default())
    }

    /// Create a new database with a custom pool config.
    pub fn with_pool_config(config: SqlitePoolConfig) -> PoolResult<Self> {
        let temp_dir = tempfile::Builder::new().prefix("dagplanner-test").tempdir()?;
        let db_path = temp_dir.path().join("calendar.db");
        let pool = SqlitePool::open(&db_path, config)?;

        Ok(Self { db_path, pool, _temp_dir: temp_dir })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Borrow a connection from the underlying pool.
    pub fn connection(&self) -> PoolResult<SqliteConnection> {
        self.pool.get_connection()
    }
}

//! SQLite pragma management
//!
//! Applies per-connection pragmas when r2d2 opens a new connection.

use rusqlite::Connection;

use super::config::SqlitePoolConfig;
use super::error::{PoolError, PoolResult};

/// Apply connection-level pragmas
///
/// - WAL mode so readers never block the single writer
/// - NORMAL synchronous mode, durable across application crashes in WAL
/// - Foreign key constraints
/// - Busy timeout for lock contention between pooled connections
pub fn apply_connection_pragmas(conn: &Connection, config: &SqlitePoolConfig) -> PoolResult<()> {
    let mut pragma_sql = String::new();

    if config.enable_wal {
        pragma_sql.push_str("PRAGMA journal_mode=WAL;\n");
        pragma_sql.push_str("PRAGMA wal_autocheckpoint=1000;\n");
    }

    pragma_sql.push_str("PRAGMA synchronous=NORMAL;\n");

    if config.enable_foreign_keys {
        pragma_sql.push_str("PRAGMA foreign_keys=ON;\n");
    }

    conn.execute_batch(&pragma_sql)
        .map_err(|e| PoolError::Query(format!("Failed to apply pragmas: {e}")))?;

    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| PoolError::Query(format!("Failed to set busy timeout: {e}")))?;

    Ok(())
}

//! Pool error types
//!
//! Errors raised while opening, configuring or borrowing pooled SQLite
//! connections. Higher layers translate these into domain storage errors.

use thiserror::Error;

/// Connection pool error type
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(String),

    #[error("Connection timeout after {0}s")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Rusqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    R2d2(#[from] r2d2::Error),
}

/// Pool result type
pub type PoolResult<T> = Result<T, PoolError>;

impl PoolError {
    /// Check if this error is transient
    ///
    /// Lock contention and pool timeouts usually clear on their own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Rusqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }
}

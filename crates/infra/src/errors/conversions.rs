//! Conversions from external infrastructure errors into domain errors.

use dagplanner_common::storage::PoolError;
use dagplanner_domain::{DagPlannerError, StorageError};
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DagPlannerError);

impl From<InfraError> for DagPlannerError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DagPlannerError> for InfraError {
    fn from(value: DagPlannerError) -> Self {
        InfraError(value)
    }
}

impl std::fmt::Display for InfraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for InfraError {}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoStorageError {
    fn into_storage(self) -> StorageError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → StorageError */
/* -------------------------------------------------------------------------- */

impl IntoStorageError for SqlError {
    fn into_storage(self) -> StorageError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => {
                        StorageError::TransactionAborted("database is busy".into())
                    }
                    ErrorCode::DatabaseLocked => {
                        StorageError::TransactionAborted("database is locked".into())
                    }
                    ErrorCode::ConstraintViolation => StorageError::TransactionAborted(format!(
                        "constraint violation (code {}): {message}",
                        err.extended_code
                    )),
                    _ => StorageError::IoFailure(format!(
                        "sqlite failure {:?} (code {}): {message}",
                        err.code, err.extended_code
                    )),
                }
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                StorageError::IoFailure(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                StorageError::IoFailure(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => StorageError::IoFailure(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => StorageError::IoFailure(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(DagPlannerError::Storage(value.into_storage()))
    }
}

/* -------------------------------------------------------------------------- */
/* PoolError → StorageError */
/* -------------------------------------------------------------------------- */

impl IntoStorageError for PoolError {
    fn into_storage(self) -> StorageError {
        match self {
            PoolError::Rusqlite(err) => err.into_storage(),
            PoolError::Timeout(secs) => StorageError::TransactionAborted(format!(
                "no database connection available after {secs}s"
            )),
            other => StorageError::IoFailure(other.to_string()),
        }
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(DagPlannerError::Storage(value.into_storage()))
    }
}

/// Map a pool error straight into the domain error.
pub fn map_pool_error(err: PoolError) -> DagPlannerError {
    InfraError::from(err).into()
}

/// Map a failed blocking task into the domain error.
pub fn map_join_error(err: JoinError) -> DagPlannerError {
    if err.is_cancelled() {
        DagPlannerError::Internal("blocking database task was cancelled".into())
    } else {
        DagPlannerError::Internal(format!("blocking database task panicked: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::ffi;

    use super::*;

    fn sqlite_failure(code: i32, message: &str) -> SqlError {
        SqlError::SqliteFailure(ffi::Error::new(code), Some(message.to_string()))
    }

    #[test]
    fn busy_and_locked_abort_the_transaction() {
        let busy: DagPlannerError = InfraError::from(sqlite_failure(ffi::SQLITE_BUSY, "")).into();
        let locked: DagPlannerError =
            InfraError::from(sqlite_failure(ffi::SQLITE_LOCKED, "")).into();

        assert_eq!(busy, StorageError::TransactionAborted("database is busy".into()).into());
        assert_eq!(locked, StorageError::TransactionAborted("database is locked".into()).into());
    }

    #[test]
    fn trigger_abort_is_a_transaction_abort() {
        let err: DagPlannerError = InfraError::from(sqlite_failure(
            ffi::SQLITE_CONSTRAINT_TRIGGER,
            "injected failure",
        ))
        .into();

        match err {
            DagPlannerError::Storage(StorageError::TransactionAborted(message)) => {
                assert!(message.contains("injected failure"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_failures_are_io_failures() {
        let err: DagPlannerError =
            InfraError::from(sqlite_failure(ffi::SQLITE_IOERR, "disk I/O error")).into();
        assert_eq!(err.label(), "storage_io");

        let err = map_pool_error(PoolError::InvalidConfig("max_size".into()));
        assert_eq!(err.label(), "storage_io");
    }

    #[test]
    fn pool_timeouts_abort_instead_of_failing_io() {
        let err = map_pool_error(PoolError::Timeout(5));
        assert_eq!(err.label(), "storage_aborted");
    }
}

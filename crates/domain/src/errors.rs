//! Error types used throughout the calendar cache

use chrono::NaiveDate;
use thiserror::Error;

/// Failures raised by the durable event store.
///
/// A write that fails with any of these variants has committed nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage I/O failure: {0}")]
    IoFailure(String),

    #[error("transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },
}

/// Failures reported by the remote calendar provider collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote provider rejected credentials: {0}")]
    Unauthorized(String),

    #[error("remote provider unreachable: {0}")]
    NetworkUnavailable(String),

    #[error("remote provider rate limited the request")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("remote provider error: {0}")]
    Unknown(String),
}

impl RemoteError {
    /// Whether a later attempt could succeed without user intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkUnavailable(_) | Self::RateLimited { .. })
    }
}

/// Main error type for DagPlanner operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DagPlannerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Caller passed a range whose lower bound lies after its upper bound.
    #[error("invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("invalid remote snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DagPlannerError {
    /// Stable label suitable for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Storage(StorageError::IoFailure(_)) => "storage_io",
            Self::Storage(StorageError::TransactionAborted(_)) => "storage_aborted",
            Self::Storage(StorageError::SchemaMismatch { .. }) => "schema_mismatch",
            Self::Remote(_) => "remote",
            Self::InvalidRange { .. } => "invalid_range",
            Self::InvalidSnapshot(_) => "invalid_snapshot",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for DagPlanner operations
pub type Result<T> = std::result::Result<T, DagPlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_retryability() {
        assert!(RemoteError::NetworkUnavailable("offline".into()).is_retryable());
        assert!(RemoteError::RateLimited { retry_after_secs: Some(30) }.is_retryable());
        assert!(!RemoteError::Unauthorized("token revoked".into()).is_retryable());
        assert!(!RemoteError::Unknown("boom".into()).is_retryable());
    }

    #[test]
    fn storage_errors_convert_transparently() {
        let err: DagPlannerError =
            StorageError::SchemaMismatch { expected: "abc".into(), found: "def".into() }.into();
        assert_eq!(err.to_string(), "schema mismatch: expected abc, found def");
        assert_eq!(err.label(), "schema_mismatch");
    }

    #[test]
    fn invalid_range_names_both_bounds() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let err = DagPlannerError::InvalidRange { from, to };
        assert_eq!(err.to_string(), "invalid date range: 2024-01-06 is after 2024-01-02");
    }
}

//! SQLite storage primitives
//!
//! Connection pooling, pragmas and health reporting shared by the
//! infrastructure layer.

pub mod config;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod pragmas;
pub mod types;

pub use config::SqlitePoolConfig;
pub use connection::SqliteConnection;
pub use error::{PoolError, PoolResult};
pub use metrics::PoolMetrics;
pub use pool::SqlitePool;
pub use types::HealthStatus;

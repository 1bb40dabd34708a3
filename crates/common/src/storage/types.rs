//! Storage health reporting

/// Health snapshot of a connection pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub active_connections: usize,
    pub idle_connections: usize,
    pub max_connections: usize,
    /// Failure detail when unhealthy
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn healthy(active: usize, idle: usize, max: usize) -> Self {
        Self {
            healthy: true,
            active_connections: active,
            idle_connections: idle,
            max_connections: max,
            message: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            active_connections: 0,
            idle_connections: 0,
            max_connections: 0,
            message: Some(message.into()),
        }
    }
}

//! # Sizopi Runtime
//!
//! The imperative shell of the Sizopi booking subsystem.
//!
//! ## Core Components
//!
//! - **Reservation Manager**: runs capacity decisions inside store transactions
//! - **Retry**: exponential backoff for transient transaction failures
//! - **Metrics**: Prometheus counters and histograms for booking outcomes
//! - **Health**: component health checks for readiness probes
//!
//! ## Example
//!
//! ```ignore
//! use sizopi_runtime::ReservationManager;
//!
//! let manager = ReservationManager::new(store);
//!
//! let reservation = manager.create(command).await?;
//! let report = manager.capacity(&reservation.facility_name, reservation.visit_date).await?;
//! ```

use serde::Serialize;

/// Reservation manager
pub mod manager;

/// Retry logic with exponential backoff
pub mod retry;

/// Prometheus metrics for observability
pub mod metrics;

pub use manager::ReservationManager;
pub use retry::RetryPolicy;

/// Health check status levels
///
/// Indicates the current health state of a component or system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,

    /// Component is not operational
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Get the worst status between two statuses
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            _ => Self::Healthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check result for a component
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    /// Name of the component being checked
    pub component: String,

    /// Current health status
    pub status: HealthStatus,

    /// Optional message providing details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheck {
    /// Create a healthy check result
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            message: None,
        }
    }

    /// Create an unhealthy check result
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
        }
    }
}

/// Aggregated health report
///
/// Combines multiple health checks into an overall system status.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall system status (worst of all checks)
    pub status: HealthStatus,

    /// Individual component checks
    pub checks: Vec<HealthCheck>,

    /// Timestamp when report was generated
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    /// Create a new health report from checks
    #[must_use]
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .fold(HealthStatus::Healthy, HealthStatus::worst);

        Self {
            status,
            checks,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Check if overall system is healthy
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_ordering() {
        assert!(HealthStatus::Healthy < HealthStatus::Unhealthy);
        assert_eq!(
            HealthStatus::Healthy.worst(HealthStatus::Unhealthy),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthStatus::Healthy.worst(HealthStatus::Healthy),
            HealthStatus::Healthy
        );
        assert_eq!(HealthStatus::Unhealthy.to_string(), "unhealthy");
    }

    #[test]
    fn test_report_takes_worst_status() {
        let report = HealthReport::new(vec![
            HealthCheck::healthy("http"),
            HealthCheck::unhealthy("database", "Connection failed"),
        ]);
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(!report.is_healthy());

        assert!(HealthReport::new(vec![HealthCheck::healthy("database")]).is_healthy());
    }
}

//! Health check and metrics endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use sizopi_core::environment::Clock;
use sizopi_core::store::ReservationStore;
use sizopi_runtime::{HealthReport, HealthStatus};

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check dependencies (database, etc.).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness check that pings the reservation store.
///
/// # Status Codes
///
/// - 200 OK: Healthy
/// - 503 Service Unavailable: Unhealthy
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "checks": [{ "component": "database", "status": "healthy" }],
///   "timestamp": "2025-06-01T10:00:00Z"
/// }
/// ```
pub async fn readiness<S, C>(
    State(state): State<AppState<S, C>>,
) -> (StatusCode, Json<HealthReport>)
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    let report = HealthReport::new(vec![state.manager.health().await]);

    let status = match report.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(report))
}

/// Prometheus text exposition.
///
/// # Errors
///
/// Returns 404 `NOT_FOUND` when the server was started without a recorder.
#[allow(clippy::unused_async)]
pub async fn metrics<S, C>(
    State(state): State<AppState<S, C>>,
) -> Result<impl IntoResponse, AppError>
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| AppError::not_found("metrics recorder is not installed"))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}

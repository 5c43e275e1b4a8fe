//! Router configuration.
//!
//! Builds the complete Axum router with all endpoints.

use crate::handlers::{capacity, facilities, health, reservations};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{Router, routing::get};
use sizopi_core::environment::Clock;
use sizopi_core::store::ReservationStore;
use tower_http::trace::TraceLayer;

/// Booking and lookup routes, mounted both at `/` and under `/api`.
fn api_routes<S, C>() -> Router<AppState<S, C>>
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    Router::new()
        // Capacity
        .route("/capacity", get(capacity::get_capacity::<S, C>))
        // Reservations
        .route(
            "/reservations",
            get(reservations::list_reservations::<S, C>)
                .post(reservations::create_reservation::<S, C>)
                .put(reservations::amend_reservation::<S, C>)
                .delete(reservations::cancel_reservation::<S, C>),
        )
        .route(
            "/reservations/:visitor_id/:facility/:date",
            get(reservations::get_reservation::<S, C>),
        )
        // Facilities
        .route("/facilities", get(facilities::list_facilities::<S, C>))
        .route("/facilities/:name", get(facilities::get_facility::<S, C>))
}

/// Build the complete Axum router.
///
/// Configures:
/// - Health, readiness and Prometheus endpoints
/// - Capacity, reservation and facility endpoints at `/` and `/api`
/// - Request tracing and correlation IDs
pub fn build_router<S, C>(state: AppState<S, C>) -> Router
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    Router::new()
        // Health checks
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness::<S, C>))
        .route("/metrics", get(health::metrics::<S, C>))
        .merge(api_routes())
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

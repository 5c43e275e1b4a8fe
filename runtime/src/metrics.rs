//! Prometheus metrics for reservation operations.
//!
//! Metrics are recorded through the `metrics` facade. The binary installs the
//! Prometheus recorder once at startup with [`install_recorder`] and renders
//! the returned handle at `GET /metrics`. When no recorder is installed (unit
//! tests), recording is a no-op.
//!
//! # Example
//!
//! ```rust,no_run
//! use sizopi_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//! let text = handle.render();
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use sizopi_core::ReservationError;
use sizopi_core::types::TicketCount;
use std::time::Duration;
use thiserror::Error;

/// Reservations processed, labelled by `operation` and `outcome`.
pub const RESERVATIONS_TOTAL: &str = "sizopi_reservations_total";
/// Booking requests refused for lack of capacity.
pub const CAPACITY_REJECTIONS_TOTAL: &str = "sizopi_capacity_rejections_total";
/// Tickets sold through new reservations.
pub const TICKETS_BOOKED_TOTAL: &str = "sizopi_tickets_booked_total";
/// Booking transactions retried after a transient failure.
pub const TRANSACTION_RETRIES_TOTAL: &str = "sizopi_transaction_retries_total";
/// Wall time of a booking operation including retries.
pub const BOOKING_DURATION_SECONDS: &str = "sizopi_booking_duration_seconds";

const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Build the Prometheus exporter configured with Sizopi's histogram buckets.
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the bucket configuration is rejected.
pub fn builder() -> Result<PrometheusBuilder, MetricsError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .map_err(|e| MetricsError::Build(e.to_string()))
}

/// Describe every metric and install the Prometheus recorder globally.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = builder()?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;
    register_metrics();
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        RESERVATIONS_TOTAL,
        "Total number of reservation operations by operation and outcome"
    );
    describe_counter!(
        CAPACITY_REJECTIONS_TOTAL,
        "Total number of bookings rejected because the date was full"
    );
    describe_counter!(
        TICKETS_BOOKED_TOTAL,
        "Total number of tickets sold by new reservations"
    );
    describe_counter!(
        TRANSACTION_RETRIES_TOTAL,
        "Total number of booking transactions retried after a transient failure"
    );
    describe_histogram!(
        BOOKING_DURATION_SECONDS,
        "Time taken to complete a booking operation, including retries"
    );
}

/// Booking metrics recorder.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record the result of a booking operation (`create`, `amend`, `cancel`).
    pub fn record_outcome<T>(
        operation: &'static str,
        result: &Result<T, ReservationError>,
        duration: Duration,
    ) {
        let outcome = match result {
            Ok(_) => "success",
            Err(ReservationError::Validation { .. }) => "invalid",
            Err(
                ReservationError::FacilityNotFound(_) | ReservationError::ReservationNotFound(_),
            ) => "not_found",
            Err(ReservationError::Conflict(_)) => "conflict",
            Err(ReservationError::CapacityExceeded { .. }) => "capacity_exceeded",
            Err(ReservationError::InvalidState { .. }) => "invalid_state",
            Err(ReservationError::Store(_)) => "error",
        };

        counter!(RESERVATIONS_TOTAL, "operation" => operation, "outcome" => outcome).increment(1);
        histogram!(BOOKING_DURATION_SECONDS, "operation" => operation)
            .record(duration.as_secs_f64());

        if matches!(result, Err(ReservationError::CapacityExceeded { .. })) {
            counter!(CAPACITY_REJECTIONS_TOTAL, "operation" => operation).increment(1);
        }
    }

    /// Record tickets sold by a new reservation.
    pub fn record_tickets_booked(tickets: TicketCount) {
        counter!(TICKETS_BOOKED_TOTAL).increment(u64::from(tickets.get()));
    }

    /// Record one retry of a booking transaction.
    pub fn record_retry(operation: &'static str) {
        counter!(TRANSACTION_RETRIES_TOTAL, "operation" => operation).increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sizopi_core::StoreError;

    #[test]
    fn test_outcomes_render_with_labels() {
        let recorder = builder().unwrap().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            BookingMetrics::record_outcome::<()>("create", &Ok(()), Duration::from_millis(3));
            BookingMetrics::record_outcome::<()>(
                "create",
                &Err(ReservationError::Store(StoreError::Transient("40001".into()))),
                Duration::from_millis(3),
            );
            BookingMetrics::record_tickets_booked(TicketCount::new(4).unwrap());
            BookingMetrics::record_retry("amend");
        });

        let rendered = handle.render();
        assert!(rendered.contains(
            r#"sizopi_reservations_total{operation="create",outcome="success"} 1"#
        ));
        assert!(rendered.contains(
            r#"sizopi_reservations_total{operation="create",outcome="error"} 1"#
        ));
        assert!(rendered.contains("sizopi_tickets_booked_total 4"));
        assert!(rendered.contains(r#"sizopi_transaction_retries_total{operation="amend"} 1"#));
        assert!(rendered.contains("sizopi_booking_duration_seconds_bucket"));
    }
}

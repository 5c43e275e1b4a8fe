//! Application state for Axum handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use sizopi_core::environment::{Clock, SystemClock};
use sizopi_core::store::ReservationStore;
use sizopi_runtime::ReservationManager;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via `Arc`) for each request.
pub struct AppState<S, C = SystemClock> {
    /// Reservation manager that runs every booking operation
    pub manager: Arc<ReservationManager<S, C>>,

    /// Prometheus handle for `GET /metrics`; `None` when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl<S, C> AppState<S, C>
where
    S: ReservationStore,
    C: Clock,
{
    /// Create a new application state.
    #[must_use]
    pub fn new(manager: ReservationManager<S, C>) -> Self {
        Self {
            manager: Arc::new(manager),
            metrics: None,
        }
    }

    /// Serve the given Prometheus handle at `GET /metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

// Manual impl: deriving would require `S: Clone` and `C: Clone`.
impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            metrics: self.metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sizopi_testing::{FixedClock, InMemoryReservationStore};

    #[test]
    fn test_state_is_clone() {
        // Axum requires Clone state; the store itself need not be Clone
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState<InMemoryReservationStore, FixedClock>>();
    }

    #[test]
    fn test_clones_share_manager() {
        let state = AppState::new(ReservationManager::new(InMemoryReservationStore::new()));
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.manager, &cloned.manager));
        assert!(cloned.metrics.is_none());
    }
}

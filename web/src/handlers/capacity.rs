//! Capacity query endpoint.
//!
//! - GET /capacity?facility=<name>&date=<YYYY-MM-DD>[&tickets=<n>]

use super::{as_field, parse_date, required};
use crate::error::AppError;
use crate::extractors::ValidQuery;
use crate::state::AppState;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use sizopi_core::capacity::CapacityReport;
use sizopi_core::environment::Clock;
use sizopi_core::store::ReservationStore;
use sizopi_core::types::{FacilityName, TicketCount};

// ============================================================================
// Request / Response Types
// ============================================================================

/// Query parameters for a capacity check.
#[derive(Debug, Deserialize)]
pub struct CapacityQuery {
    /// Facility name
    pub facility: Option<String>,
    /// Visit date (`YYYY-MM-DD`)
    pub date: Option<String>,
    /// Tickets the caller wants to book
    pub tickets: Option<i64>,
}

/// Capacity report, plus whether the requested tickets fit when asked.
#[derive(Debug, Serialize)]
pub struct CapacityResponse {
    /// Sold and remaining tickets
    #[serde(flatten)]
    pub report: CapacityReport,
    /// Whether `tickets` more fit; omitted when `tickets` was not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enough: Option<bool>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Check remaining capacity for a facility on a date.
///
/// ```bash
/// curl 'http://localhost:8080/capacity?facility=Safari%20Show&date=2025-06-01&tickets=3'
/// ```
///
/// Response:
/// ```json
/// {
///   "facilityName": "Safari Show",
///   "visitDate": "2025-06-01",
///   "maxCapacity": 10,
///   "soldTickets": 8,
///   "available": 2,
///   "enough": false
/// }
/// ```
///
/// # Errors
///
/// - 400 `VALIDATION_ERROR` for a missing or malformed parameter
/// - 404 `NOT_FOUND` for an unknown facility
pub async fn get_capacity<S, C>(
    State(state): State<AppState<S, C>>,
    ValidQuery(query): ValidQuery<CapacityQuery>,
) -> Result<Json<CapacityResponse>, AppError>
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    let facility = FacilityName::parse(required("facility", query.facility.as_deref())?)
        .map_err(as_field("facility"))?;
    let date = parse_date("date", required("date", query.date.as_deref())?)?;
    let requested = query
        .tickets
        .map(|raw| TicketCount::parse("tickets", raw))
        .transpose()?;

    let report = state.manager.capacity(&facility, date).await?;
    let enough = requested.map(|tickets| report.admits(tickets));

    Ok(Json(CapacityResponse { report, enough }))
}

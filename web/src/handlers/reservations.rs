//! Reservation endpoints.
//!
//! - POST   /reservations - Book tickets
//! - PUT    /reservations - Change tickets, date or status
//! - DELETE /reservations?visitorId=&facility=&date= - Cancel
//! - GET    /reservations?visitorId= - List a visitor's reservations
//! - GET    /reservations/:visitorId/:facility/:date - Fetch one reservation

use super::{as_field, parse_date, required};
use crate::error::AppError;
use crate::extractors::{CorrelationId, ValidJson, ValidPath, ValidQuery};
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use sizopi_core::ReservationError;
use sizopi_core::environment::Clock;
use sizopi_core::store::ReservationStore;
use sizopi_core::types::{
    AmendReservation, CreateReservation, FacilityName, Reservation, ReservationKey,
    ReservationStatus, TicketCount, VisitorId,
};

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /reservations`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    /// Booking visitor
    pub visitor_id: Option<String>,
    /// Facility to book
    pub facility_name: Option<String>,
    /// Visit date (`YYYY-MM-DD`)
    pub visit_date: Option<String>,
    /// Tickets to book
    pub ticket_count: Option<i64>,
}

impl CreateReservationRequest {
    /// Validate into a typed command.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] naming the first bad field.
    pub fn into_command(self) -> Result<CreateReservation, ReservationError> {
        let key = parse_key(
            self.visitor_id.as_deref(),
            self.facility_name.as_deref(),
            self.visit_date.as_deref(),
        )?;
        let raw_count = required("ticketCount", self.ticket_count)?;
        let ticket_count = TicketCount::parse("ticketCount", raw_count)?;

        Ok(CreateReservation {
            visitor_id: key.visitor_id,
            facility_name: key.facility_name,
            visit_date: key.visit_date,
            ticket_count,
        })
    }
}

/// Body of `PUT /reservations`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendReservationRequest {
    /// Reservation owner
    pub visitor_id: Option<String>,
    /// Reserved facility
    pub facility_name: Option<String>,
    /// Current visit date (`YYYY-MM-DD`)
    pub visit_date: Option<String>,
    /// Replacement ticket count
    pub new_ticket_count: Option<i64>,
    /// Replacement visit date (`YYYY-MM-DD`)
    pub new_visit_date: Option<String>,
    /// `Active` or `Cancelled`
    pub new_status: Option<String>,
}

impl AmendReservationRequest {
    /// Validate into a typed amendment.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] naming the first bad field.
    pub fn into_command(self) -> Result<AmendReservation, ReservationError> {
        let key = parse_key(
            self.visitor_id.as_deref(),
            self.facility_name.as_deref(),
            self.visit_date.as_deref(),
        )?;
        let mut amend = AmendReservation::of(key);

        if let Some(raw) = self.new_ticket_count {
            amend = amend.ticket_count(TicketCount::parse("newTicketCount", raw)?);
        }
        if let Some(raw) = self.new_visit_date.as_deref() {
            amend = amend.visit_date(parse_date("newVisitDate", raw)?);
        }
        if let Some(raw) = self.new_status.as_deref() {
            let status = ReservationStatus::parse(raw.trim()).map_err(as_field("newStatus"))?;
            amend = amend.status(status);
        }

        Ok(amend)
    }
}

/// Query of `DELETE /reservations`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelQuery {
    /// Reservation owner
    pub visitor_id: Option<String>,
    /// Reserved facility
    pub facility: Option<String>,
    /// Visit date (`YYYY-MM-DD`)
    pub date: Option<String>,
}

/// Query of `GET /reservations`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Visitor whose reservations to list
    pub visitor_id: Option<String>,
}

/// Build a key from the three identifying request fields.
fn parse_key(
    visitor_id: Option<&str>,
    facility_name: Option<&str>,
    visit_date: Option<&str>,
) -> Result<ReservationKey, ReservationError> {
    Ok(ReservationKey::new(
        VisitorId::parse(required("visitorId", visitor_id)?)?,
        FacilityName::parse(required("facilityName", facility_name)?)?,
        parse_date("visitDate", required("visitDate", visit_date)?)?,
    ))
}

// ============================================================================
// Handlers
// ============================================================================

/// Book tickets.
///
/// ```bash
/// curl -X POST http://localhost:8080/reservations \
///   -H 'Content-Type: application/json' \
///   -d '{"visitorId":"budi","facilityName":"Safari Show","visitDate":"2025-06-01","ticketCount":2}'
/// ```
///
/// # Errors
///
/// - 400 `VALIDATION_ERROR` / `CAPACITY_EXCEEDED`
/// - 404 `NOT_FOUND` for an unknown facility
/// - 409 `CONFLICT` if the visitor already booked that facility and date
pub async fn create_reservation<S, C>(
    State(state): State<AppState<S, C>>,
    correlation_id: CorrelationId,
    ValidJson(request): ValidJson<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError>
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    let command = request.into_command()?;
    tracing::info!(
        correlation_id = %correlation_id.0,
        key = %command.key(),
        tickets = command.ticket_count.get(),
        "Creating reservation"
    );

    let reservation = state.manager.create(command).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Change ticket count, visit date or status of a reservation.
///
/// # Errors
///
/// - 400 `VALIDATION_ERROR` / `CAPACITY_EXCEEDED` / `INVALID_STATE`
/// - 404 `NOT_FOUND` if the reservation does not exist
/// - 409 `CONFLICT` if the new date collides with another reservation
pub async fn amend_reservation<S, C>(
    State(state): State<AppState<S, C>>,
    correlation_id: CorrelationId,
    ValidJson(request): ValidJson<AmendReservationRequest>,
) -> Result<Json<Reservation>, AppError>
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    let amend = request.into_command()?;
    tracing::info!(correlation_id = %correlation_id.0, key = %amend.key, "Amending reservation");

    Ok(Json(state.manager.amend(amend).await?))
}

/// Cancel a reservation. Cancelling twice returns the cancelled record.
///
/// # Errors
///
/// Returns 404 `NOT_FOUND` if the reservation does not exist.
pub async fn cancel_reservation<S, C>(
    State(state): State<AppState<S, C>>,
    correlation_id: CorrelationId,
    ValidQuery(query): ValidQuery<CancelQuery>,
) -> Result<Json<Reservation>, AppError>
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    let key = parse_key(
        query.visitor_id.as_deref(),
        query.facility.as_deref(),
        query.date.as_deref(),
    )
    .map_err(rename_key_fields)?;
    tracing::info!(correlation_id = %correlation_id.0, key = %key, "Cancelling reservation");

    Ok(Json(state.manager.cancel(key).await?))
}

/// List a visitor's reservations, ordered by visit date then facility name.
///
/// # Errors
///
/// Returns 400 `VALIDATION_ERROR` without a `visitorId`.
pub async fn list_reservations<S, C>(
    State(state): State<AppState<S, C>>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<Vec<Reservation>>, AppError>
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    let visitor = VisitorId::parse(required("visitorId", query.visitor_id.as_deref())?)?;
    Ok(Json(state.manager.list_for_visitor(&visitor).await?))
}

/// Fetch one reservation by its key.
///
/// # Errors
///
/// Returns 404 `NOT_FOUND` if the reservation does not exist.
pub async fn get_reservation<S, C>(
    State(state): State<AppState<S, C>>,
    ValidPath((visitor_id, facility, date)): ValidPath<(String, String, String)>,
) -> Result<Json<Reservation>, AppError>
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    let key = parse_key(Some(visitor_id.as_str()), Some(facility.as_str()), Some(date.as_str()))
        .map_err(rename_key_fields)?;
    Ok(Json(state.manager.get(&key).await?))
}

/// Map body field names to the short names used in query strings and paths.
fn rename_key_fields(err: ReservationError) -> ReservationError {
    match err.field() {
        Some("facilityName") => as_field("facility")(err),
        Some("visitDate") => as_field("date")(err),
        _ => err,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sizopi_core::NaiveDate;

    fn create_request() -> CreateReservationRequest {
        CreateReservationRequest {
            visitor_id: Some("budi".into()),
            facility_name: Some("Safari Show".into()),
            visit_date: Some("2025-06-01".into()),
            ticket_count: Some(2),
        }
    }

    #[test]
    fn test_create_request_into_command() {
        let command = create_request().into_command().unwrap();
        assert_eq!(command.visitor_id.as_str(), "budi");
        assert_eq!(command.visit_date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(command.ticket_count.get(), 2);
    }

    #[test]
    fn test_create_request_rejects_bad_fields() {
        let cases: [(fn(&mut CreateReservationRequest), &str); 6] = [
            (|r| r.visitor_id = None, "visitorId"),
            (|r| r.facility_name = Some("   ".into()), "facilityName"),
            (|r| r.visit_date = Some("tomorrow".into()), "visitDate"),
            (|r| r.ticket_count = Some(0), "ticketCount"),
            (|r| r.ticket_count = Some(-4), "ticketCount"),
            (|r| r.ticket_count = None, "ticketCount"),
        ];

        for (spoil, field) in cases {
            let mut request = create_request();
            spoil(&mut request);
            let err = request.into_command().unwrap_err();
            assert_eq!(err.field(), Some(field));
        }
    }

    #[test]
    fn test_amend_request_fields() {
        let request = AmendReservationRequest {
            visitor_id: Some("budi".into()),
            facility_name: Some("Safari Show".into()),
            visit_date: Some("2025-06-01".into()),
            new_ticket_count: Some(5),
            new_visit_date: Some("2025-06-03".into()),
            new_status: None,
        };
        let amend = request.into_command().unwrap();
        assert_eq!(amend.new_ticket_count.map(TicketCount::get), Some(5));
        assert_eq!(amend.new_visit_date, NaiveDate::from_ymd_opt(2025, 6, 3));
        assert_eq!(amend.new_status, None);
    }

    #[test]
    fn test_amend_request_unknown_status() {
        let request = AmendReservationRequest {
            visitor_id: Some("budi".into()),
            facility_name: Some("Safari Show".into()),
            visit_date: Some("2025-06-01".into()),
            new_status: Some("Paused".into()),
            ..AmendReservationRequest::default()
        };
        assert_eq!(request.into_command().unwrap_err().field(), Some("newStatus"));
    }

    #[test]
    fn test_query_fields_use_short_names() {
        let err = parse_key(Some("budi"), None, Some("2025-06-01"))
            .map_err(rename_key_fields)
            .unwrap_err();
        assert_eq!(err.field(), Some("facility"));
    }
}

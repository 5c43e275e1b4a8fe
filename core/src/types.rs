//! Domain types for Sizopi facility reservations.
//!
//! Identifiers are validated newtypes: once a [`VisitorId`], [`FacilityName`]
//! or [`TicketCount`] exists it is known to be well-formed, so the booking
//! logic never re-checks raw input.

use crate::error::ReservationError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Longest identifier the `FASILITAS` / `RESERVASI` tables accept.
pub const MAX_IDENTIFIER_LEN: usize = 50;

/// Largest ticket count a single reservation may hold (fits the `INTEGER` column).
pub const MAX_TICKETS_PER_RESERVATION: u32 = i32::MAX as u32;

// ============================================================================
// Identifiers
// ============================================================================

fn parse_identifier(field: &'static str, raw: &str) -> Result<String, ReservationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ReservationError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(ReservationError::validation(
            field,
            format!("must be at most {MAX_IDENTIFIER_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Identifies the visitor who owns a reservation (the visitor's username).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(String);

impl VisitorId {
    /// Parse a visitor id, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] for empty or overlong input.
    pub fn parse(raw: &str) -> Result<Self, ReservationError> {
        parse_identifier("visitorId", raw).map(Self)
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique name of a bookable facility (attraction or ride).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityName(String);

impl FacilityName {
    /// Parse a facility name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] for empty or overlong input.
    pub fn parse(raw: &str) -> Result<Self, ReservationError> {
        parse_identifier("facilityName", raw).map(Self)
    }

    /// Borrow the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FacilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A positive number of tickets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TicketCount(NonZeroU32);

impl TicketCount {
    /// Create a ticket count, returning `None` for zero or values above
    /// [`MAX_TICKETS_PER_RESERVATION`].
    #[must_use]
    pub const fn new(count: u32) -> Option<Self> {
        if count > MAX_TICKETS_PER_RESERVATION {
            return None;
        }
        match NonZeroU32::new(count) {
            Some(count) => Some(Self(count)),
            None => None,
        }
    }

    /// Validate a raw request value for the named field.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] if the value is not in
    /// `1..=MAX_TICKETS_PER_RESERVATION`.
    pub fn parse(field: &'static str, raw: i64) -> Result<Self, ReservationError> {
        u32::try_from(raw)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| {
                ReservationError::validation(
                    field,
                    format!("must be between 1 and {MAX_TICKETS_PER_RESERVATION}"),
                )
            })
    }

    /// The count as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for TicketCount {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("ticket count {value} is out of range"))
    }
}

impl From<TicketCount> for u32 {
    fn from(value: TicketCount) -> Self {
        value.get()
    }
}

impl fmt::Display for TicketCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Facility
// ============================================================================

/// What sort of facility a booking is for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FacilityKind {
    /// A show or exhibit (`ATRAKSI`).
    Attraction {
        /// Where in the zoo the attraction takes place
        location: String,
    },
    /// A ride (`WAHANA`).
    Ride {
        /// Safety rules visitors must follow
        rules: Vec<String>,
    },
    /// A facility with no attraction/ride detail row.
    General,
}

/// A bookable facility with a per-date ticket ceiling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    /// Unique facility name
    pub name: FacilityName,
    /// Scheduled time of the facility's session
    pub schedule: DateTime<Utc>,
    /// Maximum tickets that may be active for any one date (always > 0)
    pub max_capacity: u32,
    /// Attraction or ride details
    pub kind: FacilityKind,
}

// ============================================================================
// Reservation
// ============================================================================

/// Lifecycle state of a reservation.
///
/// `Active → Cancelled` is the only transition; `Cancelled` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Tickets are held and count against capacity
    Active,
    /// Reservation was cancelled; kept for reporting
    Cancelled,
}

impl ReservationStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parse status from database string.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] if the string doesn't match a
    /// known status.
    pub fn parse(s: &str) -> Result<Self, ReservationError> {
        match s {
            "Active" => Ok(Self::Active),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(ReservationError::validation(
                "status",
                format!("unknown status {other:?} (expected Active or Cancelled)"),
            )),
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite identity of a reservation: one per visitor, facility and date.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationKey {
    /// Booking visitor
    pub visitor_id: VisitorId,
    /// Booked facility
    pub facility_name: FacilityName,
    /// Calendar date of the visit
    pub visit_date: NaiveDate,
}

impl ReservationKey {
    /// Build a key.
    #[must_use]
    pub const fn new(
        visitor_id: VisitorId,
        facility_name: FacilityName,
        visit_date: NaiveDate,
    ) -> Self {
        Self {
            visitor_id,
            facility_name,
            visit_date,
        }
    }

    /// The same visitor and facility on another date.
    #[must_use]
    pub fn on_date(&self, visit_date: NaiveDate) -> Self {
        Self {
            visitor_id: self.visitor_id.clone(),
            facility_name: self.facility_name.clone(),
            visit_date,
        }
    }
}

impl fmt::Display for ReservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} on {}",
            self.visitor_id, self.facility_name, self.visit_date
        )
    }
}

/// A visitor's booking of tickets for one facility on one date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Booking visitor
    pub visitor_id: VisitorId,
    /// Booked facility
    pub facility_name: FacilityName,
    /// Calendar date of the visit
    pub visit_date: NaiveDate,
    /// Number of tickets held
    pub ticket_count: TicketCount,
    /// Lifecycle state
    pub status: ReservationStatus,
    /// When the reservation was created
    pub created_at: DateTime<Utc>,
    /// When the reservation was last modified
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// A freshly booked, active reservation.
    #[must_use]
    pub fn new_active(command: &CreateReservation, now: DateTime<Utc>) -> Self {
        Self {
            visitor_id: command.visitor_id.clone(),
            facility_name: command.facility_name.clone(),
            visit_date: command.visit_date,
            ticket_count: command.ticket_count,
            status: ReservationStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// The reservation's composite key.
    #[must_use]
    pub fn key(&self) -> ReservationKey {
        ReservationKey::new(
            self.visitor_id.clone(),
            self.facility_name.clone(),
            self.visit_date,
        )
    }

    /// Whether the reservation currently holds capacity.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    /// Copy of this reservation in the terminal `Cancelled` state.
    #[must_use]
    pub fn cancelled(&self, now: DateTime<Utc>) -> Self {
        Self {
            status: ReservationStatus::Cancelled,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Copy of this reservation moved to a new ticket count and/or date.
    #[must_use]
    pub fn rescheduled(
        &self,
        ticket_count: TicketCount,
        visit_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_count,
            visit_date,
            updated_at: now,
            ..self.clone()
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Request to book tickets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateReservation {
    /// Booking visitor
    pub visitor_id: VisitorId,
    /// Facility to book
    pub facility_name: FacilityName,
    /// Calendar date of the visit
    pub visit_date: NaiveDate,
    /// Tickets requested
    pub ticket_count: TicketCount,
}

impl CreateReservation {
    /// Key the new reservation will have.
    #[must_use]
    pub fn key(&self) -> ReservationKey {
        ReservationKey::new(
            self.visitor_id.clone(),
            self.facility_name.clone(),
            self.visit_date,
        )
    }
}

/// Request to change an existing reservation.
///
/// Every `new_*` field is optional; absent fields keep their current value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AmendReservation {
    /// Current identity of the reservation (its current visit date)
    pub key: ReservationKey,
    /// Replacement ticket count
    pub new_ticket_count: Option<TicketCount>,
    /// Replacement visit date
    pub new_visit_date: Option<NaiveDate>,
    /// Requested status
    pub new_status: Option<ReservationStatus>,
}

impl AmendReservation {
    /// An amendment of `key` that changes nothing yet.
    #[must_use]
    pub const fn of(key: ReservationKey) -> Self {
        Self {
            key,
            new_ticket_count: None,
            new_visit_date: None,
            new_status: None,
        }
    }

    /// Set the replacement ticket count.
    #[must_use]
    pub const fn ticket_count(mut self, count: TicketCount) -> Self {
        self.new_ticket_count = Some(count);
        self
    }

    /// Set the replacement visit date.
    #[must_use]
    pub const fn visit_date(mut self, date: NaiveDate) -> Self {
        self.new_visit_date = Some(date);
        self
    }

    /// Set the requested status.
    #[must_use]
    pub const fn status(mut self, status: ReservationStatus) -> Self {
        self.new_status = Some(status);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_are_trimmed() {
        let visitor = VisitorId::parse("  budi  ").unwrap();
        assert_eq!(visitor.as_str(), "budi");
    }

    #[test]
    fn test_empty_identifier_rejected() {
        let err = FacilityName::parse("   ").unwrap_err();
        assert_eq!(err.field(), Some("facilityName"));
    }

    #[test]
    fn test_overlong_identifier_rejected() {
        let raw = "x".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(VisitorId::parse(&raw).is_err());
        assert!(VisitorId::parse(&raw[1..]).is_ok());
    }

    #[test]
    fn test_ticket_count_bounds() {
        assert!(TicketCount::new(0).is_none());
        assert_eq!(TicketCount::new(1).map(TicketCount::get), Some(1));
        assert!(TicketCount::new(MAX_TICKETS_PER_RESERVATION + 1).is_none());
        assert!(TicketCount::parse("ticketCount", -3).is_err());
        assert!(TicketCount::parse("ticketCount", i64::from(u32::MAX) + 1).is_err());
        assert_eq!(TicketCount::parse("ticketCount", 7).unwrap().get(), 7);
    }

    #[test]
    fn test_status_round_trips_through_db_strings() {
        for status in [ReservationStatus::Active, ReservationStatus::Cancelled] {
            assert_eq!(ReservationStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(ReservationStatus::parse("Pending").is_err());
    }

    #[test]
    fn test_cancelled_keeps_tickets_and_date() {
        let now = Utc::now();
        let command = CreateReservation {
            visitor_id: VisitorId::parse("sari").unwrap(),
            facility_name: FacilityName::parse("Safari Show").unwrap(),
            visit_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            ticket_count: TicketCount::new(4).unwrap(),
        };
        let reservation = Reservation::new_active(&command, now);
        let cancelled = reservation.cancelled(now);

        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(cancelled.ticket_count, reservation.ticket_count);
        assert_eq!(cancelled.key(), reservation.key());
    }

    #[test]
    fn test_ticket_count_try_from_rejects_zero() {
        assert!(TicketCount::try_from(0).is_err());
        assert_eq!(TicketCount::try_from(2).map(TicketCount::get), Ok(2));
    }
}

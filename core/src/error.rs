//! Error types for reservation operations.

use crate::types::{FacilityName, ReservationKey, ReservationStatus, TicketCount};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors reported by a [`ReservationStore`](crate::store::ReservationStore)
/// implementation.
///
/// Stores classify their backend failures into these three buckets so the
/// runtime can decide whether a booking transaction is worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Serialization failure, deadlock or lost connection; safe to retry
    #[error("transient store failure: {0}")]
    Transient(String),

    /// A write collided with an existing primary key
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other backend failure
    #[error("store failure: {0}")]
    Database(String),
}

impl StoreError {
    /// Whether retrying the whole transaction may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Errors returned by reservation operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// A request field is missing or malformed
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending request field (camelCase, as it appears on the wire)
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// No facility with that name exists
    #[error("facility not found: {0}")]
    FacilityNotFound(FacilityName),

    /// No reservation with that key exists
    #[error("reservation not found: {0}")]
    ReservationNotFound(ReservationKey),

    /// A reservation already exists for that visitor, facility and date
    #[error("a reservation already exists for that date ({0})")]
    Conflict(ReservationKey),

    /// Not enough capacity left on the requested date
    #[error(
        "not enough capacity at {facility_name} on {visit_date}: requested {requested}, only {available} tickets remain"
    )]
    CapacityExceeded {
        /// Facility that is full
        facility_name: FacilityName,
        /// Date that is full
        visit_date: NaiveDate,
        /// Tickets the request needed
        requested: TicketCount,
        /// Tickets still free for that date
        available: u32,
    },

    /// The reservation's status does not allow the requested change
    #[error("reservation {key} is {status} and cannot be changed")]
    InvalidState {
        /// Reservation that was targeted
        key: ReservationKey,
        /// Its current status
        status: ReservationStatus,
    },

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReservationError {
    /// Build a field-level validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::FacilityNotFound(_) | Self::ReservationNotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::Store(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// The request field a validation error refers to.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }

    /// Whether the failed operation may be retried as a whole.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message_reports_remaining_tickets() {
        let err = ReservationError::CapacityExceeded {
            facility_name: FacilityName::parse("Safari Show").unwrap(),
            visit_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            requested: TicketCount::new(5).unwrap(),
            available: 2,
        };
        assert_eq!(err.code(), "CAPACITY_EXCEEDED");
        assert!(err.to_string().contains("only 2 tickets remain"));
    }

    #[test]
    fn test_only_transient_store_errors_retry() {
        assert!(ReservationError::from(StoreError::Transient("40001".into())).is_transient());
        assert!(!ReservationError::from(StoreError::Database("boom".into())).is_transient());
        assert!(!ReservationError::validation("ticketCount", "bad").is_transient());
    }
}

//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by resource. Request
//! DTOs keep every field optional so a missing field is reported as a
//! field-level `VALIDATION_ERROR` rather than a generic body rejection.

pub mod capacity;
pub mod facilities;
pub mod health;
pub mod reservations;

// Re-export common handler utilities
pub use health::health_check;

use sizopi_core::{NaiveDate, ReservationError};

/// Date format accepted in bodies, query strings and paths.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Unwrap a request field, naming it in the error when absent.
pub(crate) fn required<T>(field: &'static str, value: Option<T>) -> Result<T, ReservationError> {
    value.ok_or_else(|| ReservationError::validation(field, "is required"))
}

/// Parse a `YYYY-MM-DD` date for the named field.
pub(crate) fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ReservationError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ReservationError::validation(field, "must be a date in YYYY-MM-DD format"))
}

/// Re-label a validation error with the request's own field name.
pub(crate) fn as_field(
    field: &'static str,
) -> impl FnOnce(ReservationError) -> ReservationError {
    move |err| match err {
        ReservationError::Validation { message, .. } => {
            ReservationError::Validation { field, message }
        }
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sizopi_core::types::FacilityName;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("visitDate", " 2025-06-01 ").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        let err = parse_date("visitDate", "01/06/2025").unwrap_err();
        assert_eq!(err.field(), Some("visitDate"));
    }

    #[test]
    fn test_required_names_field() {
        let err = required::<String>("ticketCount", None).unwrap_err();
        assert_eq!(err.field(), Some("ticketCount"));
    }

    #[test]
    fn test_as_field_relabels_validation_only() {
        let err = FacilityName::parse("  ").map_err(as_field("facility")).unwrap_err();
        assert_eq!(err.field(), Some("facility"));

        let aquarium = FacilityName::parse("Aquarium").unwrap();
        let not_found = ReservationError::FacilityNotFound(aquarium);
        assert!(matches!(
            as_field("facility")(not_found),
            ReservationError::FacilityNotFound(_)
        ));
    }
}

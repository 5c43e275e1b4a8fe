//! Error types for web handlers.
//!
//! This module defines error types that bridge between domain errors
//! and HTTP responses, implementing Axum's `IntoResponse` trait.
//!
//! Every error is rendered as the same JSON envelope:
//!
//! ```json
//! { "code": "CAPACITY_EXCEEDED", "message": "...", "details": { "available": 2 } }
//! ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Value, json};
use sizopi_core::ReservationError;
use std::fmt;

/// Application error type for web handlers.
///
/// This type wraps domain errors and provides HTTP-friendly error responses.
/// It implements Axum's `IntoResponse` trait to automatically convert errors
/// into HTTP responses.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Reservation>, AppError> {
///     let reservation = state.manager.get(&key).await?;
///     Ok(Json(reservation))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Structured context (offending field, remaining tickets)
    details: Option<Value>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            details: None,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach structured details to the response body.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a 400 validation error, optionally naming the offending field.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "VALIDATION_ERROR")
    }

    /// Create a 400 validation error for a specific request field.
    #[must_use]
    pub fn invalid_field(field: &str, message: impl fmt::Display) -> Self {
        Self::validation(format!("invalid {field}: {message}"))
            .with_details(json!({ "field": field }))
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message.into(), "NOT_FOUND")
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT")
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: &'static str,
    /// Human-readable error message.
    message: String,
    /// Structured context.
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log internal errors
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            details: self.details,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Validation { field, message } => Self::invalid_field(field, message),
            ReservationError::FacilityNotFound(name) => {
                Self::not_found(format!("facility {name} not found"))
            }
            ReservationError::ReservationNotFound(key) => {
                Self::not_found(format!("reservation for {key} not found"))
            }
            ReservationError::Conflict(_) => {
                Self::conflict("a reservation already exists for that date")
            }
            ReservationError::CapacityExceeded {
                requested,
                available,
                ..
            } => {
                let message = err.to_string();
                Self::new(StatusCode::BAD_REQUEST, message, "CAPACITY_EXCEEDED").with_details(
                    json!({ "available": available, "requested": requested.get() }),
                )
            }
            ReservationError::InvalidState { ref key, status } => {
                let message = err.to_string();
                Self::new(StatusCode::BAD_REQUEST, message, "INVALID_STATE").with_details(
                    json!({ "status": status.as_str(), "visitDate": key.visit_date }),
                )
            }
            ReservationError::Store(store) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(store))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(format!("invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(format!("invalid query string: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(format!("invalid path: {}", rejection.body_text()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sizopi_core::NaiveDate;
    use sizopi_core::StoreError;
    use sizopi_core::types::{FacilityName, TicketCount};

    #[test]
    fn test_error_display() {
        let err = AppError::validation("Invalid input");
        assert_eq!(err.to_string(), "[VALIDATION_ERROR] Invalid input");
    }

    #[test]
    fn test_validation_is_bad_request_with_field() {
        let err = AppError::from(ReservationError::validation("ticketCount", "must be positive"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "VALIDATION_ERROR");
        assert_eq!(err.details, Some(json!({ "field": "ticketCount" })));
    }

    #[test]
    fn test_capacity_exceeded_carries_available() {
        let err = AppError::from(ReservationError::CapacityExceeded {
            facility_name: FacilityName::parse("Safari Show").unwrap(),
            visit_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            requested: TicketCount::new(3).unwrap(),
            available: 1,
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "CAPACITY_EXCEEDED");
        assert!(err.message.contains("only 1 tickets remain"));
        assert_eq!(err.details, Some(json!({ "available": 1, "requested": 3 })));
    }

    #[test]
    fn test_store_errors_are_opaque() {
        let err = AppError::from(ReservationError::Store(StoreError::Database(
            "connection refused on 10.0.0.3".into(),
        )));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("10.0.0.3"));
        assert!(err.source.is_some());
    }
}

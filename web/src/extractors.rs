//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request correlation ID set by the middleware
//! - [`ValidJson`], [`ValidQuery`], [`ValidPath`]: the stock extractors with
//!   their rejections rendered through [`AppError`], so malformed input gets
//!   the same `VALIDATION_ERROR` envelope as a domain validation failure
//!
//! # Examples
//!
//! ```ignore
//! use sizopi_web::extractors::{CorrelationId, ValidJson};
//!
//! async fn handler(
//!     State(state): State<AppState<S>>,
//!     correlation_id: CorrelationId,
//!     ValidJson(body): ValidJson<CreateReservationRequest>,
//! ) -> Result<Json<Reservation>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, "Booking");
//!     // ...
//! }
//! ```

use crate::error::AppError;
use crate::middleware::{CORRELATION_ID_HEADER, parse_correlation_header};
use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Prefers the ID stored by the correlation middleware, then the
/// `X-Correlation-ID` header, and generates a new UUID v4 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }

        let correlation_id = parse_correlation_header(parts.headers.get(CORRELATION_ID_HEADER))
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// JSON body extractor that rejects with [`AppError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string extractor that rejects with [`AppError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Path parameter extractor that rejects with [`AppError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

//! Axum middleware for request tracking and observability.
//!
//! # Flow
//!
//! 1. **Extract** correlation ID from `X-Correlation-ID` header (or generate new UUID)
//! 2. **Store** it as a [`CorrelationId`] in request extensions for handler access
//! 3. **Create tracing span** with `correlation_id` field
//! 4. **Inject** correlation ID into response `X-Correlation-ID` header
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use sizopi_web::middleware::correlation_id_layer;
//!
//! let app = Router::new()
//!     .route("/reservations", post(create_reservation))
//!     .layer(correlation_id_layer());
//! ```

use crate::extractors::CorrelationId;
use axum::{extract::Request, http::HeaderValue, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Read a correlation ID header value, if it is a valid UUID.
pub(crate) fn parse_correlation_header(value: Option<&HeaderValue>) -> Option<Uuid> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = parse_correlation_header(req.headers().get(CORRELATION_ID_HEADER))
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(CorrelationId(correlation_id));

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, routing::get};
    use tower::ServiceExt;

    async fn echo(correlation_id: CorrelationId) -> String {
        correlation_id.0.to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/echo", get(echo))
            .layer(correlation_id_layer())
    }

    #[tokio::test]
    async fn test_generates_correlation_id() {
        let response = app()
            .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response.headers().get(CORRELATION_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(header.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_echoes_client_correlation_id_to_handler_and_response() {
        let id = Uuid::new_v4();
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/echo")
                    .header(CORRELATION_ID_HEADER, id.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(CORRELATION_ID_HEADER).unwrap(),
            id.to_string().as_str()
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, id.to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_replaces_malformed_correlation_id() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/echo")
                    .header(CORRELATION_ID_HEADER, "not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let header = response.headers().get(CORRELATION_ID_HEADER).unwrap();
        assert_ne!(header, "not-a-uuid");
        assert!(Uuid::parse_str(header.to_str().unwrap()).is_ok());
    }
}

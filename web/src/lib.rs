//! Axum HTTP surface for Sizopi reservations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON
//! │  - Request parsing and validation       │  ← Correlation IDs, tracing
//! │  - Response serialization               │  ← Error envelope
//! ├─────────────────────────────────────────┤
//! │         Reservation Manager             │  ← Transactions, retries
//! ├─────────────────────────────────────────┤
//! │         Functional Core                 │
//! │  - Capacity arithmetic                  │  ← Pure, no I/O
//! │  - Amendment planning                   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract and validate** the body or query into a typed command
//! 3. **Run** the command through the [`sizopi_runtime::ReservationManager`]
//! 4. **Map result** to a JSON response or an [`AppError`] envelope
//!
//! # Example
//!
//! ```ignore
//! use sizopi_runtime::ReservationManager;
//! use sizopi_web::{AppState, build_router};
//!
//! let state = AppState::new(ReservationManager::new(store)).with_metrics(handle);
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{CorrelationId, ValidJson, ValidPath, ValidQuery};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::build_router;
pub use state::AppState;

//! Facility listing endpoints.
//!
//! - GET /facilities
//! - GET /facilities/:name

use super::as_field;
use crate::error::AppError;
use crate::extractors::ValidPath;
use crate::state::AppState;
use axum::{Json, extract::State};
use sizopi_core::environment::Clock;
use sizopi_core::store::ReservationStore;
use sizopi_core::types::{Facility, FacilityName};

/// List every bookable facility, ordered by name.
///
/// # Errors
///
/// Returns 500 if the store cannot be read.
pub async fn list_facilities<S, C>(
    State(state): State<AppState<S, C>>,
) -> Result<Json<Vec<Facility>>, AppError>
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    Ok(Json(state.manager.facilities().await?))
}

/// Fetch one facility with its attraction or ride details.
///
/// # Errors
///
/// Returns 404 `NOT_FOUND` for an unknown facility.
pub async fn get_facility<S, C>(
    State(state): State<AppState<S, C>>,
    ValidPath(name): ValidPath<String>,
) -> Result<Json<Facility>, AppError>
where
    S: ReservationStore + 'static,
    C: Clock + 'static,
{
    let name = FacilityName::parse(&name).map_err(as_field("name"))?;
    Ok(Json(state.manager.facility(&name).await?))
}

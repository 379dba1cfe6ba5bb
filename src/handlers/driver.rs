use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::error::AppResult;
use crate::pipeline::{self, RideCreated, RideSubmission};
use crate::utils::jwt::Claims;
use crate::AppState;

/// Publish a ride for the logged-in driver.
///
/// The response reports how much route geometry was stored; a ride is created
/// even when the routing service could not provide a path.
pub async fn create_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RideSubmission>,
) -> AppResult<(StatusCode, Json<RideCreated>)> {
    let created = pipeline::create_ride(
        &state.db,
        &state.routing,
        &state.simplifier,
        claims.sub,
        payload,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

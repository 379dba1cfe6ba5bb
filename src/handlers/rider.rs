use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::SeaOrmRideStore;
use crate::error::{AppError, AppResult};
use crate::pipeline::{self, MatchResult, SearchQuery};
use crate::utils::geo::Coordinate;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub destination_lat: f64,
    pub destination_lon: f64,
    pub date: NaiveDate,
    pub radius_m: Option<f64>,
    pub passengers: Option<i32>,
}

impl SearchParams {
    pub fn into_query(self, default_radius_m: f64) -> SearchQuery {
        SearchQuery {
            origin: Coordinate::new(self.origin_lat, self.origin_lon),
            destination: Coordinate::new(self.destination_lat, self.destination_lon),
            date: self.date,
            radius_m: self.radius_m.unwrap_or(default_radius_m),
            passengers: self.passengers.unwrap_or(1),
        }
    }
}

/// Search rides passing near the rider's origin and destination
pub async fn search_rides(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<MatchResult>>> {
    let query = params.into_query(state.config.search.default_radius_m);
    query.validate(state.config.search.max_radius_m)?;

    let results = pipeline::search_rides(SeaOrmRideStore::new(&state.db), &query).await;
    Ok(Json(results))
}

/// Reconstructed route of a single ride
pub async fn ride_route(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<MatchResult>> {
    let route = pipeline::ride_route(SeaOrmRideStore::new(&state.db), ride_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride".to_string()))?;

    Ok(Json(route))
}

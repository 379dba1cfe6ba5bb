use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::limit::GlobalConcurrencyLimitLayer;

use crate::handlers::{driver, rider};
use crate::middleware::auth::auth_middleware;
use crate::middleware::rate_limit::create_public_governor;
use crate::AppState;

/// Ride creations allowed to wait on the routing service at once
const MAX_CONCURRENT_RIDE_CREATIONS: usize = 32;

pub fn create_router(state: AppState) -> Router {
    // Public routes (rate limited per IP)
    let rider_routes = Router::new()
        .route("/search", get(rider::search_rides))
        .route("/{id}/route", get(rider::ride_route))
        .layer(create_public_governor());

    // Driver routes (requires a valid access token)
    let driver_routes = Router::new()
        .route("/", post(driver::create_ride))
        .layer(GlobalConcurrencyLimitLayer::new(MAX_CONCURRENT_RIDE_CREATIONS))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/rides", rider_routes.merge(driver_routes))
        .with_state(state)
}

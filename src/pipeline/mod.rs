//! Route geometry pipeline.
//!
//! Ride creation: validate, fetch the driving route, simplify it, then store the
//! ride and its waypoints in one transaction. Rider search: run the datastore's
//! candidate query and rebuild one clean path per candidate.

pub mod matcher;
pub mod model;
pub mod reconstructor;
pub mod routing;
pub mod simplifier;
pub mod writer;

use sea_orm::{DatabaseConnection, TransactionTrait};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{RideStore, SeaOrmRideStore};

pub use matcher::CandidateMatcher;
pub use model::{
    CandidateRide, GeometryStatus, MatchResult, NamedLocation, NewRide, NewWaypoint,
    PlannedRide, RideCreated, RideSubmission, RideSummary, SearchQuery,
};
pub use reconstructor::reconstruct;
pub use routing::{OsrmClient, RouteGeometry, RouteProvider, RoutingError};
pub use simplifier::WaypointSimplifier;
pub use writer::RideWriter;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("routing service unavailable: {0}")]
    RoutingUnavailable(String),

    #[error("failed to create ride: {0}")]
    RideCreationFailed(String),

    #[error("failed to store waypoints for ride {ride_id}: {reason}")]
    WaypointPersistenceFailed { ride_id: Uuid, reason: String },

    #[error("candidate ride query failed: {0}")]
    MatchQueryFailed(String),

    #[error("invalid waypoint #{index} on ride {ride_id}: {reason}")]
    InvalidWaypoint {
        ride_id: Uuid,
        index: usize,
        reason: String,
    },

    #[error("{0}")]
    InvalidRide(String),

    #[error("{0}")]
    InvalidQuery(String),
}

impl From<RoutingError> for PipelineError {
    fn from(e: RoutingError) -> Self {
        PipelineError::RoutingUnavailable(e.to_string())
    }
}

/// Validates a submission and resolves its simplified route geometry.
///
/// A routing failure is not an error here: the ride is planned without
/// waypoints and flagged `RouteUnavailable`.
#[tracing::instrument(skip_all, fields(%driver_id))]
pub async fn plan_ride<R>(
    routing: &R,
    simplifier: &WaypointSimplifier,
    driver_id: Uuid,
    submission: RideSubmission,
) -> Result<PlannedRide, PipelineError>
where
    R: RouteProvider,
{
    submission.validate()?;

    let start = submission.start.coordinate();
    let end = submission.end.coordinate();

    let planned = match routing.fetch_route(start, end).await {
        Ok(geometry) => {
            let waypoints = simplifier.simplify(&geometry.points, geometry.distance_m);
            tracing::debug!(
                full = geometry.points.len(),
                kept = waypoints.len(),
                distance_m = geometry.distance_m,
                "route simplified"
            );
            PlannedRide {
                ride: NewRide::from_submission(driver_id, submission, Some(geometry.distance_m)),
                full_point_count: geometry.points.len(),
                waypoints,
                status: GeometryStatus::Complete,
            }
        }
        Err(e) => {
            let err = PipelineError::from(e);
            tracing::warn!(error = %err, "planning ride without route geometry");
            PlannedRide {
                ride: NewRide::from_submission(driver_id, submission, None),
                full_point_count: 0,
                waypoints: Vec::new(),
                status: GeometryStatus::RouteUnavailable,
            }
        }
    };

    Ok(planned)
}

/// Plans a ride and commits it with its waypoints.
///
/// Routing runs before the transaction opens.
pub async fn create_ride<R>(
    db: &DatabaseConnection,
    routing: &R,
    simplifier: &WaypointSimplifier,
    driver_id: Uuid,
    submission: RideSubmission,
) -> Result<RideCreated, PipelineError>
where
    R: RouteProvider,
{
    let planned = plan_ride(routing, simplifier, driver_id, submission).await?;

    let txn = db
        .begin()
        .await
        .map_err(|e| PipelineError::RideCreationFailed(e.to_string()))?;

    let created = RideWriter::new(SeaOrmRideStore::new(&txn))
        .persist(&planned)
        .await?;

    txn.commit()
        .await
        .map_err(|e| PipelineError::RideCreationFailed(e.to_string()))?;

    tracing::info!(
        ride_id = %created.ride_id,
        waypoint_count = created.waypoint_count,
        geometry_status = ?created.geometry_status,
        "ride created"
    );
    Ok(created)
}

/// Candidate search for a rider. Query failures yield an empty list.
pub async fn search_rides<S>(store: S, query: &SearchQuery) -> Vec<MatchResult>
where
    S: RideStore,
{
    match CandidateMatcher::new(store).find_candidates(query).await {
        Ok(candidates) => candidates.into_iter().map(reconstruct).collect(),
        Err(err) => {
            tracing::warn!(error = %err, "search degraded to empty result");
            Vec::new()
        }
    }
}

/// Reconstructed path of one stored ride.
pub async fn ride_route<S>(store: S, ride_id: Uuid) -> Result<Option<MatchResult>, PipelineError>
where
    S: RideStore,
{
    let candidate = store
        .find_ride(ride_id)
        .await
        .map_err(|e| PipelineError::MatchQueryFailed(e.to_string()))?;

    Ok(candidate.map(reconstruct))
}

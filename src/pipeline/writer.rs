use super::model::{GeometryStatus, NewWaypoint, PlannedRide, RideCreated};
use super::PipelineError;
use crate::db::RideStore;
use crate::entities::waypoint::DEFAULT_LOCATION_NAME;

/// Stores a planned ride, then its waypoints under the generated ride id.
pub struct RideWriter<S>
where
    S: RideStore,
{
    store: S,
}

impl<S> RideWriter<S>
where
    S: RideStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(
        skip(self, planned),
        fields(driver_id = %planned.ride.driver_id, waypoints = planned.waypoints.len())
    )]
    pub async fn persist(&self, planned: &PlannedRide) -> Result<RideCreated, PipelineError> {
        let ride_id = self.store.insert_ride(&planned.ride).await.map_err(|e| {
            tracing::error!(error = %e, "failed to insert ride");
            PipelineError::RideCreationFailed(e.to_string())
        })?;

        let mut status = planned.status;
        let mut waypoint_count = 0;

        if !planned.waypoints.is_empty() {
            let rows = planned
                .waypoints
                .iter()
                .enumerate()
                .map(|(position, point)| NewWaypoint {
                    position: position as i32,
                    location_name: DEFAULT_LOCATION_NAME.to_string(),
                    lat: point.lat,
                    lon: point.lon,
                })
                .collect();

            match self.store.insert_waypoints(ride_id, rows).await {
                Ok(inserted) => waypoint_count = inserted,
                Err(e) => {
                    // The ride stays bookable without its path
                    let err = PipelineError::WaypointPersistenceFailed {
                        ride_id,
                        reason: e.to_string(),
                    };
                    tracing::warn!(error = %err, "ride stored without waypoints");
                    status = GeometryStatus::WaypointsNotStored;
                }
            }
        }

        tracing::debug!(%ride_id, waypoint_count, "ride persisted");

        Ok(RideCreated {
            ride_id,
            waypoint_count,
            full_point_count: planned.full_point_count,
            route_distance_m: planned.ride.route_distance_m,
            geometry_status: status,
        })
    }
}

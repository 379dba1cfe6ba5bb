use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PipelineError;
use crate::utils::geo::Coordinate;

/// A named endpoint of a ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl NamedLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Ride offer as submitted by a driver.
#[derive(Debug, Clone, Deserialize)]
pub struct RideSubmission {
    pub start: NamedLocation,
    pub end: NamedLocation,
    pub departure_time: DateTime<Utc>,
    pub available_seats: i32,
    pub price: f64,
    #[serde(default)]
    pub vehicle_details: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RideSubmission {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let start = self.start.coordinate();
        let end = self.end.coordinate();

        if !start.is_valid() {
            return Err(PipelineError::InvalidRide(format!(
                "start coordinate ({}, {}) is out of range",
                start.lat, start.lon
            )));
        }
        if !end.is_valid() {
            return Err(PipelineError::InvalidRide(format!(
                "end coordinate ({}, {}) is out of range",
                end.lat, end.lon
            )));
        }
        if start == end {
            return Err(PipelineError::InvalidRide(
                "start and end must be different locations".to_string(),
            ));
        }
        if self.available_seats <= 0 {
            return Err(PipelineError::InvalidRide(
                "a ride must offer at least 1 seat".to_string(),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(PipelineError::InvalidRide(
                "price must be a non-negative amount".to_string(),
            ));
        }
        if self.start.name.trim().is_empty() || self.end.name.trim().is_empty() {
            return Err(PipelineError::InvalidRide(
                "start and end locations need a name".to_string(),
            ));
        }

        Ok(())
    }
}

/// Ride record ready to be written. The id is generated by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRide {
    pub driver_id: Uuid,
    pub start: NamedLocation,
    pub end: NamedLocation,
    pub departure_time: DateTime<Utc>,
    pub available_seats: i32,
    pub price: f64,
    pub vehicle_details: Option<String>,
    pub notes: Option<String>,
    pub route_distance_m: Option<f64>,
}

impl NewRide {
    pub fn from_submission(
        driver_id: Uuid,
        submission: RideSubmission,
        route_distance_m: Option<f64>,
    ) -> Self {
        Self {
            driver_id,
            start: submission.start,
            end: submission.end,
            departure_time: submission.departure_time,
            available_seats: submission.available_seats,
            price: submission.price,
            vehicle_details: submission.vehicle_details,
            notes: submission.notes,
            route_distance_m,
        }
    }
}

/// One waypoint row, tagged with its owning ride at insert time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWaypoint {
    pub position: i32,
    pub location_name: String,
    pub lat: f64,
    pub lon: f64,
}

/// How much route geometry ended up stored with a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryStatus {
    Complete,
    RouteUnavailable,
    WaypointsNotStored,
}

/// Output of route planning: the ride plus its simplified geometry.
#[derive(Debug, Clone)]
pub struct PlannedRide {
    pub ride: NewRide,
    pub waypoints: Vec<Coordinate>,
    pub full_point_count: usize,
    pub status: GeometryStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RideCreated {
    pub ride_id: Uuid,
    pub waypoint_count: usize,
    pub full_point_count: usize,
    pub route_distance_m: Option<f64>,
    pub geometry_status: GeometryStatus,
}

/// Rider search parameters, live for a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub date: NaiveDate,
    pub radius_m: f64,
    pub passengers: i32,
}

impl SearchQuery {
    pub fn validate(&self, max_radius_m: f64) -> Result<(), PipelineError> {
        if !self.origin.is_valid() {
            return Err(PipelineError::InvalidQuery(
                "origin coordinate is out of range".to_string(),
            ));
        }
        if !self.destination.is_valid() {
            return Err(PipelineError::InvalidQuery(
                "destination coordinate is out of range".to_string(),
            ));
        }
        if !self.radius_m.is_finite() || self.radius_m <= 0.0 {
            return Err(PipelineError::InvalidQuery(
                "radius must be a positive number of meters".to_string(),
            ));
        }
        if self.radius_m > max_radius_m {
            return Err(PipelineError::InvalidQuery(format!(
                "radius may not exceed {} meters",
                max_radius_m
            )));
        }
        if self.passengers <= 0 {
            return Err(PipelineError::InvalidQuery(
                "at least 1 passenger is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideSummary {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub start: NamedLocation,
    pub end: NamedLocation,
    pub departure_time: DateTime<Utc>,
    pub available_seats: i32,
    pub price: f64,
    pub vehicle_details: Option<String>,
    pub notes: Option<String>,
}

/// A stored ride as returned by the datastore, waypoints still raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRide {
    pub ride: RideSummary,
    pub waypoints: Vec<serde_json::Value>,
    pub route_distance_m: Option<f64>,
    /// Pickup plus drop-off distance reported by the candidate search
    pub match_distance_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub ride: RideSummary,
    pub path: Vec<Coordinate>,
    pub waypoint_count: usize,
    pub route_distance_m: f64,
    pub match_distance_m: Option<f64>,
}

use serde_json::Value;
use uuid::Uuid;

use super::model::{CandidateRide, MatchResult};
use super::PipelineError;
use crate::utils::geo::{path_length, Coordinate};

/// Roughly 50 m at mid-latitudes.
pub const DEDUP_TOLERANCE_DEG: f64 = 0.0005;

/// Reads `lat`/`lon` from one stored waypoint. Numeric strings are accepted.
pub fn parse_waypoint(value: &Value) -> Result<Coordinate, String> {
    let lat = coordinate_field(value, "lat")?;
    let lon = coordinate_field(value, "lon")?;

    let point = Coordinate::new(lat, lon);
    if !point.is_valid() {
        return Err(format!("coordinate ({}, {}) is out of range", lat, lon));
    }
    Ok(point)
}

fn coordinate_field(value: &Value, key: &str) -> Result<f64, String> {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("{} is not representable as f64", key)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{} is not a number: {:?}", key, s)),
        Some(other) => Err(format!("{} has unexpected value {}", key, other)),
        None => Err(format!("missing {}", key)),
    }
}

/// Parses every waypoint, logging and skipping the ones that fail.
pub fn parse_waypoints(ride_id: Uuid, raw: &[Value]) -> Vec<Coordinate> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, value)| match parse_waypoint(value) {
            Ok(point) => Some(point),
            Err(reason) => {
                let err = PipelineError::InvalidWaypoint {
                    ride_id,
                    index,
                    reason,
                };
                tracing::warn!(error = %err, "skipping waypoint");
                None
            }
        })
        .collect()
}

/// Drops a point only when it is within `tolerance` of the previous kept point on
/// both axes. The first point is always kept.
pub fn dedup_consecutive(points: &[Coordinate], tolerance: f64) -> Vec<Coordinate> {
    let mut kept: Vec<Coordinate> = Vec::with_capacity(points.len());
    for point in points {
        if let Some(last) = kept.last() {
            let near_lat = (point.lat - last.lat).abs() < tolerance;
            let near_lon = (point.lon - last.lon).abs() < tolerance;
            if near_lat && near_lon {
                continue;
            }
        }
        kept.push(*point);
    }
    kept
}

/// Builds the displayable path for one candidate: start, cleaned waypoints, end.
pub fn reconstruct(candidate: CandidateRide) -> MatchResult {
    let parsed = parse_waypoints(candidate.ride.id, &candidate.waypoints);
    let filtered = dedup_consecutive(&parsed, DEDUP_TOLERANCE_DEG);
    let waypoint_count = filtered.len();

    let mut path = Vec::with_capacity(waypoint_count + 2);
    path.push(candidate.ride.start.coordinate());
    path.extend(filtered);
    path.push(candidate.ride.end.coordinate());

    let route_distance_m = candidate
        .route_distance_m
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or_else(|| path_length(&path));

    MatchResult {
        ride: candidate.ride,
        path,
        waypoint_count,
        route_distance_m,
        match_distance_m: candidate.match_distance_m,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::{NamedLocation, RideSummary};
    use chrono::Utc;
    use serde_json::json;

    fn candidate(waypoints: Vec<Value>, route_distance_m: Option<f64>) -> CandidateRide {
        CandidateRide {
            ride: RideSummary {
                id: Uuid::new_v4(),
                driver_id: Uuid::new_v4(),
                start: NamedLocation {
                    name: "Start".to_string(),
                    lat: 0.99,
                    lon: 0.99,
                },
                end: NamedLocation {
                    name: "End".to_string(),
                    lat: 1.02,
                    lon: 1.02,
                },
                departure_time: Utc::now(),
                available_seats: 2,
                price: 10.0,
                vehicle_details: None,
                notes: None,
            },
            waypoints,
            route_distance_m,
            match_distance_m: Some(1_250.0),
        }
    }

    #[test]
    fn test_dedup_drops_near_identical_point() {
        let points = [
            Coordinate::new(1.0, 1.0),
            Coordinate::new(1.00001, 1.00001),
            Coordinate::new(1.01, 1.01),
        ];

        assert_eq!(
            dedup_consecutive(&points, DEDUP_TOLERANCE_DEG),
            vec![Coordinate::new(1.0, 1.0), Coordinate::new(1.01, 1.01)]
        );
    }

    #[test]
    fn test_dedup_keeps_point_far_on_one_axis() {
        let points = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0005, 0.0),
            Coordinate::new(0.0005, 0.0001),
            Coordinate::new(0.0005, 0.0006),
        ];

        assert_eq!(
            dedup_consecutive(&points, DEDUP_TOLERANCE_DEG),
            vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(0.0005, 0.0),
                Coordinate::new(0.0005, 0.0006),
            ]
        );
    }

    #[test]
    fn test_dedup_compares_against_last_kept_point() {
        // Each step is small but the drift adds up past the tolerance
        let points = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0003, 0.0003),
            Coordinate::new(0.0006, 0.0006),
        ];

        assert_eq!(
            dedup_consecutive(&points, DEDUP_TOLERANCE_DEG),
            vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0006, 0.0006)]
        );
    }

    #[test]
    fn test_parse_waypoint_variants() {
        assert_eq!(
            parse_waypoint(&json!({"lat": 1.5, "lon": -2.25})).unwrap(),
            Coordinate::new(1.5, -2.25)
        );
        assert_eq!(
            parse_waypoint(&json!({"lat": " 48.85 ", "lon": "2.35"})).unwrap(),
            Coordinate::new(48.85, 2.35)
        );
        assert!(parse_waypoint(&json!({"lat": "north", "lon": 2.0})).is_err());
        assert!(parse_waypoint(&json!({"lat": null, "lon": 2.0})).is_err());
        assert!(parse_waypoint(&json!({"lon": 2.0})).is_err());
        assert!(parse_waypoint(&json!({"lat": "NaN", "lon": 2.0})).is_err());
        assert!(parse_waypoint(&json!({"lat": 95.0, "lon": 2.0})).is_err());
        assert!(parse_waypoint(&json!(42)).is_err());
    }

    #[test]
    fn test_reconstruct_stitches_endpoints() {
        let result = reconstruct(candidate(
            vec![
                json!({"lat": 1.0, "lon": 1.0}),
                json!({"lat": 1.00001, "lon": 1.00001}),
                json!({"lat": 1.01, "lon": 1.01}),
            ],
            Some(4_800.0),
        ));

        assert_eq!(
            result.path,
            vec![
                Coordinate::new(0.99, 0.99),
                Coordinate::new(1.0, 1.0),
                Coordinate::new(1.01, 1.01),
                Coordinate::new(1.02, 1.02),
            ]
        );
        assert_eq!(result.waypoint_count, 2);
        assert_eq!(result.route_distance_m, 4_800.0);
        assert_eq!(result.match_distance_m, Some(1_250.0));
    }

    #[test]
    fn test_reconstruct_survives_bad_waypoints() {
        let empty = reconstruct(candidate(Vec::new(), None));
        assert_eq!(
            empty.path,
            vec![Coordinate::new(0.99, 0.99), Coordinate::new(1.02, 1.02)]
        );

        let garbage = reconstruct(candidate(
            vec![json!({"lat": "x", "lon": "y"}), json!("oops"), json!({})],
            None,
        ));
        assert_eq!(garbage.path.len(), 2);
        assert_eq!(garbage.waypoint_count, 0);
        assert_eq!(garbage.path[0], Coordinate::new(0.99, 0.99));
        assert_eq!(garbage.path[1], Coordinate::new(1.02, 1.02));
    }

    #[test]
    fn test_reconstruct_computes_missing_distance() {
        let result = reconstruct(candidate(vec![json!({"lat": 1.0, "lon": 1.0})], None));
        assert!((result.route_distance_m - path_length(&result.path)).abs() < 1e-9);
        assert!(result.route_distance_m > 0.0);
    }

    #[test]
    fn test_mixed_valid_and_invalid_keeps_order() {
        let result = reconstruct(candidate(
            vec![
                json!({"lat": 1.0, "lon": 1.0}),
                json!({"lat": "bad", "lon": 1.005}),
                json!({"lat": "1.005", "lon": "1.005"}),
                json!({"lat": 1.01, "lon": 1.01}),
            ],
            None,
        ));

        assert_eq!(result.waypoint_count, 3);
        assert_eq!(result.path[2], Coordinate::new(1.005, 1.005));
    }
}

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult,
    QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{ride, waypoint};
use crate::pipeline::model::{
    CandidateRide, NamedLocation, NewRide, NewWaypoint, RideSummary, SearchQuery,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Datastore operations used by the pipeline.
#[cfg_attr(test, mockall::automock)]
pub trait RideStore: Send + Sync {
    /// Inserts the ride row and returns its generated id.
    async fn insert_ride(&self, ride: &NewRide) -> Result<Uuid, StoreError>;

    /// Inserts the waypoint batch for `ride_id`, all or nothing.
    async fn insert_waypoints(
        &self,
        ride_id: Uuid,
        waypoints: Vec<NewWaypoint>,
    ) -> Result<usize, StoreError>;

    /// Ranked candidates for a rider search, with embedded waypoints.
    async fn find_candidate_rides(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<CandidateRide>, StoreError>;

    async fn find_ride(&self, ride_id: Uuid) -> Result<Option<CandidateRide>, StoreError>;
}

/// Postgres-backed store over a connection or an open transaction.
pub struct SeaOrmRideStore<'a, C> {
    conn: &'a C,
}

impl<'a, C> SeaOrmRideStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

#[derive(Debug, FromQueryResult)]
struct CandidateRow {
    id: Uuid,
    driver_id: Uuid,
    start_name: String,
    start_lat: f64,
    start_lon: f64,
    end_name: String,
    end_lat: f64,
    end_lon: f64,
    departure_time: DateTimeWithTimeZone,
    available_seats: i32,
    price: f64,
    vehicle_details: Option<String>,
    notes: Option<String>,
    route_distance_m: Option<f64>,
    match_distance_m: Option<f64>,
    waypoints: Option<Value>,
}

impl From<CandidateRow> for CandidateRide {
    fn from(row: CandidateRow) -> Self {
        let waypoints = match row.waypoints {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                tracing::warn!(ride_id = %row.id, value = %other, "waypoints column is not an array");
                Vec::new()
            }
        };

        CandidateRide {
            ride: RideSummary {
                id: row.id,
                driver_id: row.driver_id,
                start: NamedLocation {
                    name: row.start_name,
                    lat: row.start_lat,
                    lon: row.start_lon,
                },
                end: NamedLocation {
                    name: row.end_name,
                    lat: row.end_lat,
                    lon: row.end_lon,
                },
                departure_time: row.departure_time.with_timezone(&Utc),
                available_seats: row.available_seats,
                price: row.price,
                vehicle_details: row.vehicle_details,
                notes: row.notes,
            },
            waypoints,
            route_distance_m: row.route_distance_m,
            match_distance_m: row.match_distance_m,
        }
    }
}

impl From<ride::Model> for RideSummary {
    fn from(r: ride::Model) -> Self {
        RideSummary {
            id: r.id,
            driver_id: r.driver_id,
            start: NamedLocation {
                name: r.start_name,
                lat: r.start_lat,
                lon: r.start_lon,
            },
            end: NamedLocation {
                name: r.end_name,
                lat: r.end_lat,
                lon: r.end_lon,
            },
            departure_time: r.departure_time.with_timezone(&Utc),
            available_seats: r.available_seats,
            price: r.price,
            vehicle_details: r.vehicle_details,
            notes: r.notes,
        }
    }
}

impl<'a, C> RideStore for SeaOrmRideStore<'a, C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    async fn insert_ride(&self, ride: &NewRide) -> Result<Uuid, StoreError> {
        let ride_id = Uuid::new_v4();
        let model = ride::ActiveModel {
            id: Set(ride_id),
            driver_id: Set(ride.driver_id),
            start_name: Set(ride.start.name.clone()),
            start_lat: Set(ride.start.lat),
            start_lon: Set(ride.start.lon),
            end_name: Set(ride.end.name.clone()),
            end_lat: Set(ride.end.lat),
            end_lon: Set(ride.end.lon),
            departure_time: Set(ride.departure_time.fixed_offset()),
            available_seats: Set(ride.available_seats),
            price: Set(ride.price),
            vehicle_details: Set(ride.vehicle_details.clone()),
            notes: Set(ride.notes.clone()),
            route_distance_m: Set(ride.route_distance_m),
            ..Default::default()
        };

        model.insert(self.conn).await?;
        Ok(ride_id)
    }

    async fn insert_waypoints(
        &self,
        ride_id: Uuid,
        waypoints: Vec<NewWaypoint>,
    ) -> Result<usize, StoreError> {
        if waypoints.is_empty() {
            return Ok(0);
        }

        let count = waypoints.len();
        let rows = waypoints.into_iter().map(|w| waypoint::ActiveModel {
            ride_id: Set(ride_id),
            position: Set(w.position),
            location_name: Set(w.location_name),
            lat: Set(w.lat),
            lon: Set(w.lon),
            ..Default::default()
        });

        // Nested inside an open transaction this is a savepoint, so a failed
        // batch leaves the ride row intact.
        let savepoint = self.conn.begin().await?;
        match waypoint::Entity::insert_many(rows).exec(&savepoint).await {
            Ok(_) => {
                savepoint.commit().await?;
                Ok(count)
            }
            Err(e) => {
                savepoint.rollback().await?;
                Err(e.into())
            }
        }
    }

    async fn find_candidate_rides(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<CandidateRide>, StoreError> {
        let stmt = Statement::from_sql_and_values(
            self.conn.get_database_backend(),
            "SELECT * FROM find_candidate_rides($1, $2, $3, $4, $5, $6, $7)",
            [
                query.origin.lat.into(),
                query.origin.lon.into(),
                query.destination.lat.into(),
                query.destination.lon.into(),
                query.date.into(),
                query.radius_m.into(),
                query.passengers.into(),
            ],
        );

        let rows = CandidateRow::find_by_statement(stmt).all(self.conn).await?;
        Ok(rows.into_iter().map(CandidateRide::from).collect())
    }

    async fn find_ride(&self, ride_id: Uuid) -> Result<Option<CandidateRide>, StoreError> {
        let Some(found) = ride::Entity::find_by_id(ride_id).one(self.conn).await? else {
            return Ok(None);
        };

        let waypoints = waypoint::Entity::find()
            .filter(waypoint::Column::RideId.eq(ride_id))
            .order_by_asc(waypoint::Column::Position)
            .all(self.conn)
            .await?
            .into_iter()
            .map(|w| json!({ "lat": w.lat, "lon": w.lon, "location_name": w.location_name }))
            .collect();

        let route_distance_m = found.route_distance_m;
        Ok(Some(CandidateRide {
            ride: found.into(),
            waypoints,
            route_distance_m,
            match_distance_m: None,
        }))
    }
}

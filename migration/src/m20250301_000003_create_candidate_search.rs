use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const CREATE_HAVERSINE: &str = r#"
CREATE OR REPLACE FUNCTION haversine_m(
    lat1 DOUBLE PRECISION,
    lon1 DOUBLE PRECISION,
    lat2 DOUBLE PRECISION,
    lon2 DOUBLE PRECISION
) RETURNS DOUBLE PRECISION
LANGUAGE sql IMMUTABLE STRICT AS $$
    SELECT 2 * 6371000 * asin(sqrt(
        power(sin(radians(lat2 - lat1) / 2), 2)
        + cos(radians(lat1)) * cos(radians(lat2)) * power(sin(radians(lon2 - lon1) / 2), 2)
    ))
$$;
"#;

// Pickup is the path point nearest the rider's origin, drop-off the point
// nearest the destination; both must be inside the radius and in travel order.
const CREATE_FIND_CANDIDATE_RIDES: &str = r#"
CREATE OR REPLACE FUNCTION find_candidate_rides(
    p_origin_lat DOUBLE PRECISION,
    p_origin_lon DOUBLE PRECISION,
    p_dest_lat DOUBLE PRECISION,
    p_dest_lon DOUBLE PRECISION,
    p_travel_date DATE,
    p_radius_m DOUBLE PRECISION,
    p_min_seats INTEGER
) RETURNS TABLE (
    id UUID,
    driver_id UUID,
    start_name VARCHAR,
    start_lat DOUBLE PRECISION,
    start_lon DOUBLE PRECISION,
    end_name VARCHAR,
    end_lat DOUBLE PRECISION,
    end_lon DOUBLE PRECISION,
    departure_time TIMESTAMPTZ,
    available_seats INTEGER,
    price DOUBLE PRECISION,
    vehicle_details TEXT,
    notes TEXT,
    route_distance_m DOUBLE PRECISION,
    match_distance_m DOUBLE PRECISION,
    waypoints JSON
)
LANGUAGE sql STABLE AS $$
    WITH day_rides AS (
        SELECT r.*
        FROM ride r
        WHERE (r.departure_time AT TIME ZONE 'UTC')::date = p_travel_date
          AND r.available_seats >= p_min_seats
    ),
    path AS (
        SELECT d.id AS ride_id, -1 AS seq, d.start_lat AS lat, d.start_lon AS lon
        FROM day_rides d
        UNION ALL
        SELECT w.ride_id, w.position, w.lat, w.lon
        FROM waypoint w
        JOIN day_rides d ON d.id = w.ride_id
        UNION ALL
        SELECT d.id, 2147483647, d.end_lat, d.end_lon
        FROM day_rides d
    ),
    pickup AS (
        SELECT DISTINCT ON (pa.ride_id)
            pa.ride_id, pa.seq, haversine_m(p_origin_lat, p_origin_lon, pa.lat, pa.lon) AS dist
        FROM path pa
        WHERE haversine_m(p_origin_lat, p_origin_lon, pa.lat, pa.lon) <= p_radius_m
        ORDER BY pa.ride_id, dist
    ),
    dropoff AS (
        SELECT DISTINCT ON (pa.ride_id)
            pa.ride_id, pa.seq, haversine_m(p_dest_lat, p_dest_lon, pa.lat, pa.lon) AS dist
        FROM path pa
        WHERE haversine_m(p_dest_lat, p_dest_lon, pa.lat, pa.lon) <= p_radius_m
        ORDER BY pa.ride_id, dist
    )
    SELECT
        d.id,
        d.driver_id,
        d.start_name,
        d.start_lat,
        d.start_lon,
        d.end_name,
        d.end_lat,
        d.end_lon,
        d.departure_time,
        d.available_seats,
        d.price,
        d.vehicle_details,
        d.notes,
        d.route_distance_m,
        pu.dist + dr.dist,
        COALESCE(
            (
                SELECT json_agg(
                    json_build_object('lat', w.lat, 'lon', w.lon, 'location_name', w.location_name)
                    ORDER BY w.position
                )
                FROM waypoint w
                WHERE w.ride_id = d.id
            ),
            '[]'::json
        )
    FROM day_rides d
    JOIN pickup pu ON pu.ride_id = d.id
    JOIN dropoff dr ON dr.ride_id = d.id
    WHERE pu.seq < dr.seq
    ORDER BY pu.dist + dr.dist, d.departure_time
$$;
"#;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(CREATE_HAVERSINE).await?;
        db.execute_unprepared(CREATE_FIND_CANDIDATE_RIDES).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP FUNCTION IF EXISTS find_candidate_rides(
                DOUBLE PRECISION, DOUBLE PRECISION, DOUBLE PRECISION, DOUBLE PRECISION,
                DATE, DOUBLE PRECISION, INTEGER
            )",
        )
        .await?;
        db.execute_unprepared(
            "DROP FUNCTION IF EXISTS haversine_m(
                DOUBLE PRECISION, DOUBLE PRECISION, DOUBLE PRECISION, DOUBLE PRECISION
            )",
        )
        .await?;
        Ok(())
    }
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ride")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub driver_id: Uuid,
    pub start_name: String,
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_name: String,
    pub end_lat: f64,
    pub end_lon: f64,
    pub departure_time: DateTimeWithTimeZone,
    pub available_seats: i32,
    pub price: f64,
    #[sea_orm(column_type = "Text", nullable)]
    pub vehicle_details: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub route_distance_m: Option<f64>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::waypoint::Entity")]
    Waypoints,
}

impl Related<super::waypoint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Waypoints.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

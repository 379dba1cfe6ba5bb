use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Label stored when no reverse-geocoded name is available.
pub const DEFAULT_LOCATION_NAME: &str = "Waypoint";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "waypoint")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub ride_id: Uuid,
    pub position: i32,
    pub location_name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ride::Entity",
        from = "Column::RideId",
        to = "super::ride::Column::Id"
    )]
    Ride,
}

impl Related<super::ride::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ride.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

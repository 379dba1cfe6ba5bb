use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_rides::Ride;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Waypoint::Table)
                    .if_not_exists()
                    .col(pk_auto(Waypoint::Id))
                    .col(uuid(Waypoint::RideId).not_null())
                    .col(integer(Waypoint::Position).not_null())
                    .col(
                        string(Waypoint::LocationName)
                            .not_null()
                            .default("Waypoint"),
                    )
                    .col(double(Waypoint::Lat).not_null())
                    .col(double(Waypoint::Lon).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_waypoint_ride")
                            .from(Waypoint::Table, Waypoint::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_waypoint_ride_position")
                    .table(Waypoint::Table)
                    .col(Waypoint::RideId)
                    .col(Waypoint::Position)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Waypoint::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Waypoint {
    Table,
    Id,
    RideId,
    Position,
    LocationName,
    Lat,
    Lon,
}

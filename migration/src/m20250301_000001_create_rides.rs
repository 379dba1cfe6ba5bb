use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ride::Table)
                    .if_not_exists()
                    .col(uuid(Ride::Id).primary_key())
                    .col(uuid(Ride::DriverId).not_null())
                    .col(string(Ride::StartName).not_null())
                    .col(double(Ride::StartLat).not_null())
                    .col(double(Ride::StartLon).not_null())
                    .col(string(Ride::EndName).not_null())
                    .col(double(Ride::EndLat).not_null())
                    .col(double(Ride::EndLon).not_null())
                    .col(timestamp_with_time_zone(Ride::DepartureTime).not_null())
                    .col(
                        integer(Ride::AvailableSeats)
                            .not_null()
                            .check(Expr::col(Ride::AvailableSeats).gt(0)),
                    )
                    .col(
                        double(Ride::Price)
                            .not_null()
                            .check(Expr::col(Ride::Price).gte(0.0)),
                    )
                    .col(text_null(Ride::VehicleDetails))
                    .col(text_null(Ride::Notes))
                    .col(double_null(Ride::RouteDistanceM))
                    .col(
                        timestamp_with_time_zone(Ride::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Candidate search filters on the departure date first
        manager
            .create_index(
                Index::create()
                    .name("idx_ride_departure_time")
                    .table(Ride::Table)
                    .col(Ride::DepartureTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ride::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ride {
    Table,
    Id,
    DriverId,
    StartName,
    StartLat,
    StartLon,
    EndName,
    EndLat,
    EndLon,
    DepartureTime,
    AvailableSeats,
    Price,
    VehicleDetails,
    Notes,
    RouteDistanceM,
    CreatedAt,
}

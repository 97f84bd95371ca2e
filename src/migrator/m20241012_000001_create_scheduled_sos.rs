use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScheduledSos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScheduledSos::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScheduledSos::UserId).string().not_null())
                    .col(ColumnDef::new(ScheduledSos::Message).text().not_null())
                    .col(ColumnDef::new(ScheduledSos::EmergencyType).string().not_null())
                    .col(ColumnDef::new(ScheduledSos::Latitude).double().not_null())
                    .col(ColumnDef::new(ScheduledSos::Longitude).double().not_null())
                    .col(ColumnDef::new(ScheduledSos::SelectedCircleIds).json().not_null())
                    .col(
                        ColumnDef::new(ScheduledSos::ScheduledTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledSos::BatteryStatus)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(ScheduledSos::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scheduled_sos_user_time")
                    .table(ScheduledSos::Table)
                    .col(ScheduledSos::UserId)
                    .col(ScheduledSos::ScheduledTime)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScheduledSos::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScheduledSos {
    Table,
    Id,
    UserId,
    Message,
    EmergencyType,
    Latitude,
    Longitude,
    SelectedCircleIds,
    ScheduledTime,
    BatteryStatus,
    CreatedAt,
}

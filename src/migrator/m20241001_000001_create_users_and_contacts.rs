use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Uid).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string())
                    .col(ColumnDef::new(Users::Email).string())
                    .col(ColumnDef::new(Users::PhoneNumber).string())
                    .col(ColumnDef::new(Users::ProfileImage).text())
                    .col(ColumnDef::new(Users::Latitude).double())
                    .col(ColumnDef::new(Users::Longitude).double())
                    .col(ColumnDef::new(Users::BatteryLevel).integer())
                    .col(ColumnDef::new(Users::ExpoPushToken).string())
                    .col(
                        ColumnDef::new(Users::Status)
                            .string()
                            .not_null()
                            .default("offline"),
                    )
                    .col(
                        ColumnDef::new(Users::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Contacts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contacts::UserId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contacts::Name).string())
                    .col(ColumnDef::new(Contacts::Email).string())
                    .col(ColumnDef::new(Contacts::PhoneNumber).string())
                    .col(ColumnDef::new(Contacts::Latitude).double())
                    .col(ColumnDef::new(Contacts::Longitude).double())
                    .col(ColumnDef::new(Contacts::BatteryPercentage).integer())
                    .col(ColumnDef::new(Contacts::ProfileImage).text())
                    .col(ColumnDef::new(Contacts::EmergencyNumber).string())
                    .col(
                        ColumnDef::new(Contacts::Status)
                            .string()
                            .not_null()
                            .default("offline"),
                    )
                    .col(ColumnDef::new(Contacts::ExpoPushToken).string())
                    .col(
                        ColumnDef::new(Contacts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contacts_user")
                            .from(Contacts::Table, Contacts::UserId)
                            .to(Users::Table, Users::Uid)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contacts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Uid,
    Name,
    Email,
    PhoneNumber,
    ProfileImage,
    Latitude,
    Longitude,
    BatteryLevel,
    ExpoPushToken,
    Status,
    LastSyncedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Contacts {
    Table,
    UserId,
    Name,
    Email,
    PhoneNumber,
    Latitude,
    Longitude,
    BatteryPercentage,
    ProfileImage,
    EmergencyNumber,
    Status,
    ExpoPushToken,
    UpdatedAt,
}

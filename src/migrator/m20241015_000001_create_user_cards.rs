use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserCards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserCards::Uid)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserCards::FullName).string().not_null())
                    .col(ColumnDef::new(UserCards::Age).integer().not_null())
                    .col(ColumnDef::new(UserCards::BloodGroup).string().not_null())
                    .col(ColumnDef::new(UserCards::Medicines).json().not_null())
                    .col(ColumnDef::new(UserCards::Disease).json().not_null())
                    .col(ColumnDef::new(UserCards::Allergies).json().not_null())
                    .col(ColumnDef::new(UserCards::EmergencyNumbers).json().not_null())
                    .col(
                        ColumnDef::new(UserCards::Address)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(UserCards::EmergencyInstructions)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(UserCards::QrCodeDetails).json().not_null())
                    .col(ColumnDef::new(UserCards::QrCodeImage).text().not_null())
                    .col(
                        ColumnDef::new(UserCards::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserCards::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserCards::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserCards {
    Table,
    Uid,
    FullName,
    Age,
    BloodGroup,
    Medicines,
    Disease,
    Allergies,
    EmergencyNumbers,
    Address,
    EmergencyInstructions,
    QrCodeDetails,
    QrCodeImage,
    CreatedAt,
    UpdatedAt,
}

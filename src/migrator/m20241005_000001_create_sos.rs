use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sos::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Sos::UserId).string().not_null())
                    .col(ColumnDef::new(Sos::Message).text().not_null())
                    .col(ColumnDef::new(Sos::EmergencyType).string().not_null())
                    .col(ColumnDef::new(Sos::LocationAddress).text())
                    .col(ColumnDef::new(Sos::Latitude).double())
                    .col(ColumnDef::new(Sos::Longitude).double())
                    .col(ColumnDef::new(Sos::SenderName).string())
                    .col(ColumnDef::new(Sos::SenderProfileImage).text())
                    .col(
                        ColumnDef::new(Sos::SenderBattery)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(Sos::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sos_user_id")
                    .table(Sos::Table)
                    .col(Sos::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sos_created_at")
                    .table(Sos::Table)
                    .col(Sos::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SosCircles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SosCircles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SosCircles::SosId).uuid().not_null())
                    .col(ColumnDef::new(SosCircles::CircleId).uuid().not_null())
                    .col(ColumnDef::new(SosCircles::CircleName).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sos_circles_sos")
                            .from(SosCircles::Table, SosCircles::SosId)
                            .to(Sos::Table, Sos::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SosRecipients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SosRecipients::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SosRecipients::SosId).uuid().not_null())
                    .col(ColumnDef::new(SosRecipients::ContactId).string().not_null())
                    .col(ColumnDef::new(SosRecipients::Name).string())
                    .col(
                        ColumnDef::new(SosRecipients::NotifiedVia)
                            .string()
                            .not_null()
                            .default("App"),
                    )
                    .col(
                        ColumnDef::new(SosRecipients::Acknowledged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SosRecipients::AcknowledgedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sos_recipients_sos")
                            .from(SosRecipients::Table, SosRecipients::SosId)
                            .to(Sos::Table, Sos::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sos_recipients_sos_contact")
                    .table(SosRecipients::Table)
                    .col(SosRecipients::SosId)
                    .col(SosRecipients::ContactId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SosRecipients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SosCircles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sos::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Sos {
    Table,
    Id,
    UserId,
    Message,
    EmergencyType,
    LocationAddress,
    Latitude,
    Longitude,
    SenderName,
    SenderProfileImage,
    SenderBattery,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SosCircles {
    Table,
    Id,
    SosId,
    CircleId,
    CircleName,
}

#[derive(DeriveIden)]
enum SosRecipients {
    Table,
    Id,
    SosId,
    ContactId,
    Name,
    NotifiedVia,
    Acknowledged,
    AcknowledgedAt,
}

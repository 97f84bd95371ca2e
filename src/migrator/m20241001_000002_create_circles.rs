use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Circles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Circles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Circles::Name).string().not_null())
                    .col(ColumnDef::new(Circles::ProfileImage).text())
                    .col(ColumnDef::new(Circles::AdminId).string().not_null())
                    .col(ColumnDef::new(Circles::CircleCode).string_len(6).not_null())
                    .col(
                        ColumnDef::new(Circles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_circles_circle_code")
                    .table(Circles::Table)
                    .col(Circles::CircleCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_circles_admin_id")
                    .table(Circles::Table)
                    .col(Circles::AdminId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CircleMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CircleMembers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CircleMembers::CircleId).uuid().not_null())
                    .col(ColumnDef::new(CircleMembers::UserId).string().not_null())
                    .col(ColumnDef::new(CircleMembers::Role).string().not_null())
                    .col(
                        ColumnDef::new(CircleMembers::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_circle_members_circle")
                            .from(CircleMembers::Table, CircleMembers::CircleId)
                            .to(Circles::Table, Circles::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_circle_members_contact")
                            .from(CircleMembers::Table, CircleMembers::UserId)
                            .to(Contacts::Table, Contacts::UserId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One role per (circle, contact)
        manager
            .create_index(
                Index::create()
                    .name("idx_circle_members_circle_user")
                    .table(CircleMembers::Table)
                    .col(CircleMembers::CircleId)
                    .col(CircleMembers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_circle_members_user_id")
                    .table(CircleMembers::Table)
                    .col(CircleMembers::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CircleMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Circles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Circles {
    Table,
    Id,
    Name,
    ProfileImage,
    AdminId,
    CircleCode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CircleMembers {
    Table,
    Id,
    CircleId,
    UserId,
    Role,
    JoinedAt,
}

#[derive(DeriveIden)]
enum Contacts {
    Table,
    UserId,
}

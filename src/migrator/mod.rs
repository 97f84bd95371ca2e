use sea_orm_migration::prelude::*;

mod m20241001_000001_create_users_and_contacts;
mod m20241001_000002_create_circles;
mod m20241005_000001_create_sos;
mod m20241012_000001_create_scheduled_sos;
mod m20241015_000001_create_user_cards;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241001_000001_create_users_and_contacts::Migration),
            Box::new(m20241001_000002_create_circles::Migration),
            Box::new(m20241005_000001_create_sos::Migration),
            Box::new(m20241012_000001_create_scheduled_sos::Migration),
            Box::new(m20241015_000001_create_user_cards::Migration),
        ]
    }
}

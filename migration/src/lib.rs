pub use sea_orm_migration::prelude::*;

mod m20260110_000001_create_schema_and_base_setup;
mod m20260110_000002_add_applications;
mod m20260110_000003_add_auth_sessions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_000001_create_schema_and_base_setup::Migration),
            Box::new(m20260110_000002_add_applications::Migration),
            Box::new(m20260110_000003_add_auth_sessions::Migration),
        ]
    }
}

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_tables;
mod m20250301_000002_create_system_settings;
mod m20250310_000001_create_payments;
mod m20250312_000001_create_broadcasts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_tables::Migration),
            Box::new(m20250301_000002_create_system_settings::Migration),
            Box::new(m20250310_000001_create_payments::Migration),
            Box::new(m20250312_000001_create_broadcasts::Migration),
        ]
    }
}

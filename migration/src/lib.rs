//! Database migrations for the data-bundle reselling service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_10_000001_create_vendors;
mod m2025_01_10_000002_create_networks;
mod m2025_01_10_000003_create_bundles;
mod m2025_01_10_000004_create_orders;
mod m2025_01_10_000005_create_withdrawals;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_10_000001_create_vendors::Migration),
            Box::new(m2025_01_10_000002_create_networks::Migration),
            Box::new(m2025_01_10_000003_create_bundles::Migration),
            Box::new(m2025_01_10_000004_create_orders::Migration),
            Box::new(m2025_01_10_000005_create_withdrawals::Migration),
        ]
    }
}

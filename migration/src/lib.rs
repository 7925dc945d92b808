//! Database migrations for the ERP bridge.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_02_090000_create_installations;
mod m2025_06_02_090100_create_erp_configs;
mod m2025_06_02_090200_create_sync_operations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_02_090000_create_installations::Migration),
            Box::new(m2025_06_02_090100_create_erp_configs::Migration),
            Box::new(m2025_06_02_090200_create_sync_operations::Migration),
        ]
    }
}

//! Schema migrations for the audit tables, applied at connect time

mod m20250301_000001_create_audit_tables;

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250301_000001_create_audit_tables::Migration)]
    }
}

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users_table;
mod m20260301_000002_create_packages_table;
mod m20260301_000003_create_package_plans_table;
mod m20260301_000004_create_purchases_table;
mod m20260301_000005_create_projects_table;
mod m20260301_000006_create_project_tables_table;
mod m20260301_000007_create_payments_table;
mod m20260301_000008_create_token_logs_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users_table::Migration),
            Box::new(m20260301_000002_create_packages_table::Migration),
            Box::new(m20260301_000003_create_package_plans_table::Migration),
            Box::new(m20260301_000004_create_purchases_table::Migration),
            Box::new(m20260301_000005_create_projects_table::Migration),
            Box::new(m20260301_000006_create_project_tables_table::Migration),
            Box::new(m20260301_000007_create_payments_table::Migration),
            Box::new(m20260301_000008_create_token_logs_table::Migration),
        ]
    }
}

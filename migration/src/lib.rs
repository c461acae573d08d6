//! Database migrations for the Metricly API.
//!
//! Every table is scoped by `account_id`; migrations are applied in the order
//! listed by [`Migrator::migrations`].

pub use sea_orm_migration::prelude::*;

mod m2025_01_06_000001_create_accounts_and_users;
mod m2025_01_06_000002_create_integrations;
mod m2025_01_06_000003_create_analytics_facts;
mod m2025_01_06_000004_create_subscriptions_and_invites;
mod m2025_01_06_000005_create_reporting;
mod m2025_01_06_000006_create_product_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_06_000001_create_accounts_and_users::Migration),
            Box::new(m2025_01_06_000002_create_integrations::Migration),
            Box::new(m2025_01_06_000003_create_analytics_facts::Migration),
            Box::new(m2025_01_06_000004_create_subscriptions_and_invites::Migration),
            Box::new(m2025_01_06_000005_create_reporting::Migration),
            Box::new(m2025_01_06_000006_create_product_events::Migration),
        ]
    }
}

//! # Service Layer
//!
//! Business rules between the HTTP handlers and the repositories. Services
//! enforce role permissions, plan limits and input validation; handlers only
//! translate between HTTP and these calls.

pub mod account;
pub mod auth;
pub mod billing;
pub mod custom_metrics;
pub mod events;
pub mod formula;
pub mod integrations;
pub mod metrics;
pub mod notifications;
pub mod reports;
pub mod stripe;
pub mod team;
pub mod validation;
pub mod views;

pub use billing::BillingService;
pub use integrations::IntegrationService;
pub use metrics::MetricsService;
pub use notifications::{Notification, NotificationHub};
pub use stripe::{BillingGateway, StripeClient};
pub use team::TeamService;

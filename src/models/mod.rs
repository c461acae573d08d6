//! # Data Models
//!
//! SeaORM entities for every table in the Metricly schema.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod account;
pub mod ad_account;
pub mod ad_spend;
pub mod custom_metric;
pub mod custom_report;
pub mod daily_metric;
pub mod integration;
pub mod order;
pub mod order_item;
pub mod product_event;
pub mod report_template;
pub mod saved_view;
pub mod scheduled_report;
pub mod subscription;
pub mod team_invite;
pub mod user;

pub use account::Entity as Account;
pub use ad_account::Entity as AdAccount;
pub use ad_spend::Entity as AdSpend;
pub use custom_metric::Entity as CustomMetric;
pub use custom_report::Entity as CustomReport;
pub use daily_metric::Entity as DailyMetric;
pub use integration::Entity as Integration;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product_event::Entity as ProductEvent;
pub use report_template::Entity as ReportTemplate;
pub use saved_view::Entity as SavedView;
pub use scheduled_report::Entity as ScheduledReport;
pub use subscription::Entity as Subscription;
pub use team_invite::Entity as TeamInvite;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "metricly".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

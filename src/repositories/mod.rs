//! # Repository Layer
//!
//! Repositories encapsulate SeaORM operations per entity. They are generic
//! over [`sea_orm::ConnectionTrait`] so the same code runs on a pooled
//! connection or inside a transaction; every tenant-owned lookup takes the
//! account id.

pub mod account;
pub mod ad_account;
pub mod ad_spend;
pub mod custom_metric;
pub mod custom_report;
pub mod daily_metric;
pub mod integration;
pub mod order;
pub mod product_event;
pub mod report_template;
pub mod saved_view;
pub mod scheduled_report;
pub mod subscription;
pub mod team_invite;
pub mod user;

pub use account::AccountRepository;
pub use ad_account::AdAccountRepository;
pub use ad_spend::AdSpendRepository;
pub use custom_metric::CustomMetricRepository;
pub use custom_report::CustomReportRepository;
pub use daily_metric::DailyMetricRepository;
pub use integration::IntegrationRepository;
pub use order::OrderRepository;
pub use product_event::ProductEventRepository;
pub use report_template::ReportTemplateRepository;
pub use saved_view::SavedViewRepository;
pub use scheduled_report::ScheduledReportRepository;
pub use subscription::SubscriptionRepository;
pub use team_invite::TeamInviteRepository;
pub use user::UserRepository;

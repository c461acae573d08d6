//! Scheduled report entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "scheduled_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    /// summary|campaigns|orders
    pub report_type: String,
    /// daily|weekly|monthly
    pub frequency: String,
    /// JSON array of recipient email addresses
    #[sea_orm(column_type = "JsonBinary")]
    pub recipients: JsonValue,
    pub is_active: bool,
    pub last_sent_at: Option<DateTimeWithTimeZone>,
    pub next_run_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Custom report entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "custom_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// JSON array of base metric names or custom metric keys
    #[sea_orm(column_type = "JsonBinary")]
    pub metrics: JsonValue,
    #[sea_orm(column_type = "JsonBinary")]
    pub dimensions: JsonValue,
    #[sea_orm(column_type = "JsonBinary")]
    pub filters: JsonValue,
    /// Relative range keyword (last_7_days, month_to_date, ...)
    pub date_range: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Report template entity model
//!
//! System templates have no account and are shared by every tenant.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "report_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning account, `None` for system templates
    pub account_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    /// Custom report blueprint: metrics, dimensions, filters, date_range
    #[sea_orm(column_type = "JsonBinary")]
    pub config: JsonValue,
    pub is_system: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Order entity model
//!
//! Orders are ingested from the store platform; monetary columns are stored
//! as double precision so sums can be computed in the database.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Statuses excluded from revenue totals.
pub const NON_REVENUE_STATUSES: [&str; 2] = ["refunded", "voided"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    /// Identifier on the source store, unique per account
    pub external_id: String,
    pub order_number: Option<String>,
    pub customer_email: Option<String>,
    pub total_price: f64,
    pub subtotal_price: f64,
    pub total_tax: f64,
    pub total_discounts: f64,
    pub currency: String,
    /// paid|pending|refunded|voided|partially_refunded
    pub financial_status: String,
    pub source: Option<String>,
    pub utm_campaign: Option<String>,
    pub is_new_customer: bool,
    pub ordered_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

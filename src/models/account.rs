//! Account entity model
//!
//! An account is the tenant boundary: every other tenant-scoped table carries
//! an `account_id` referencing it.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Account entity representing a billing and data-isolation boundary
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier for the account (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name for the account
    pub name: String,

    /// Subscription plan (free|starter|growth|enterprise)
    pub plan: String,

    /// Stripe customer id, set on first checkout
    pub stripe_customer_id: Option<String>,

    /// Most recent Stripe subscription id
    pub stripe_subscription_id: Option<String>,

    /// IANA timezone used for reporting
    pub timezone: String,

    /// ISO 4217 reporting currency
    pub currency: String,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    Users,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

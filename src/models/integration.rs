//! Integration entity model
//!
//! One row per (account, platform) tracking the OAuth connection lifecycle.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

/// Integration entity representing a connection to an e-commerce or ad platform
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "integrations")]
pub struct Model {
    /// Unique identifier for the integration (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning account
    pub account_id: Uuid,

    /// Platform slug (shopify|meta_ads|google_ads|tiktok_ads)
    pub platform: String,

    /// Connection status (pending|connected|disconnected|error)
    pub status: String,

    /// Identifier of the account on the external platform
    pub external_account_id: Option<String>,

    /// CSRF state issued for the pending OAuth flow
    pub oauth_state: Option<String>,

    /// Platform-specific opaque metadata
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<JsonValue>,

    /// When the OAuth callback completed
    pub connected_at: Option<DateTimeWithTimeZone>,

    /// When the last sync ran
    pub last_synced_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ad_account::Entity")]
    AdAccounts,
}

impl Related<super::ad_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

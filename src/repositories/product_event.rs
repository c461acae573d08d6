//! # Product Event Repository
//!
//! Append-only analytics log; rows are never updated.

use crate::error::RepositoryError;
use crate::models::product_event::{
    self, ActiveModel, Entity as ProductEvent, Model as ProductEventModel,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::Value;
use uuid::Uuid;

/// Repository for ProductEvent database operations
pub struct ProductEventRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ProductEventRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        account_id: Option<Uuid>,
        user_id: Option<Uuid>,
        event_name: &str,
        properties: Value,
    ) -> Result<ProductEventModel, RepositoryError> {
        let event = ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(account_id),
            user_id: Set(user_id),
            event_name: Set(event_name.to_string()),
            properties: Set(properties),
            created_at: Set(Utc::now().into()),
        };

        event
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Newest events of an account
    pub async fn list_recent(
        &self,
        account_id: Uuid,
        limit: u64,
    ) -> Result<Vec<ProductEventModel>, RepositoryError> {
        ProductEvent::find()
            .filter(product_event::Column::AccountId.eq(account_id))
            .order_by_desc(product_event::Column::CreatedAt)
            .limit(limit)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

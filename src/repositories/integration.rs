//! # Integration Repository
//!
//! Tenant-scoped persistence for platform integrations and the OAuth state
//! that links a callback back to its pending integration.

use crate::error::RepositoryError;
use crate::models::integration::{
    self, ActiveModel, Entity as Integration, Model as IntegrationModel,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, sea_query::Condition,
};
use uuid::Uuid;

/// Repository for Integration database operations
pub struct IntegrationRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> IntegrationRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn list_by_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<IntegrationModel>, RepositoryError> {
        Integration::find()
            .filter(integration::Column::AccountId.eq(account_id))
            .order_by_asc(integration::Column::Platform)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_in_account(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<IntegrationModel, RepositoryError> {
        Integration::find_by_id(id)
            .filter(integration::Column::AccountId.eq(account_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Integration"))
    }

    pub async fn find_by_platform(
        &self,
        account_id: Uuid,
        platform: &str,
    ) -> Result<Option<IntegrationModel>, RepositoryError> {
        Integration::find()
            .filter(integration::Column::AccountId.eq(account_id))
            .filter(integration::Column::Platform.eq(platform))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Integrations that count towards the plan limit (anything not disconnected)
    pub async fn count_in_use(&self, account_id: Uuid) -> Result<u64, RepositoryError> {
        Integration::find()
            .filter(integration::Column::AccountId.eq(account_id))
            .filter(integration::Column::Status.ne("disconnected"))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Create the integration row or reset an existing one to `pending` with a new state
    pub async fn upsert_pending(
        &self,
        account_id: Uuid,
        platform: &str,
        oauth_state: &str,
    ) -> Result<IntegrationModel, RepositoryError> {
        let now = Utc::now();

        match self.find_by_platform(account_id, platform).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.status = Set("pending".to_string());
                active.oauth_state = Set(Some(oauth_state.to_string()));
                active.updated_at = Set(now.into());
                active
                    .update(self.db)
                    .await
                    .map_err(RepositoryError::database_error)
            }
            None => {
                let integration = ActiveModel {
                    id: Set(Uuid::new_v4()),
                    account_id: Set(account_id),
                    platform: Set(platform.to_string()),
                    status: Set("pending".to_string()),
                    external_account_id: Set(None),
                    oauth_state: Set(Some(oauth_state.to_string())),
                    metadata: Set(None),
                    connected_at: Set(None),
                    last_synced_at: Set(None),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                integration
                    .insert(self.db)
                    .await
                    .map_err(RepositoryError::database_error)
            }
        }
    }

    /// Find the pending integration that issued `state` for `platform`
    pub async fn find_pending_by_state(
        &self,
        platform: &str,
        state: &str,
    ) -> Result<Option<IntegrationModel>, RepositoryError> {
        Integration::find()
            .filter(integration::Column::Platform.eq(platform))
            .filter(integration::Column::OauthState.eq(state))
            .filter(integration::Column::Status.eq("pending"))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Mark connected and consume the OAuth state so it cannot be replayed
    pub async fn mark_connected(
        &self,
        integration: IntegrationModel,
        metadata: serde_json::Value,
    ) -> Result<IntegrationModel, RepositoryError> {
        let now = Utc::now();
        let mut active = integration.into_active_model();
        active.status = Set("connected".to_string());
        active.oauth_state = Set(None);
        active.metadata = Set(Some(metadata));
        active.connected_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn mark_disconnected(
        &self,
        integration: IntegrationModel,
    ) -> Result<IntegrationModel, RepositoryError> {
        let mut active = integration.into_active_model();
        active.status = Set("disconnected".to_string());
        active.oauth_state = Set(None);
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Connected integrations never synced or last synced before `cutoff`
    pub async fn list_due_for_sync(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<IntegrationModel>, RepositoryError> {
        Integration::find()
            .filter(integration::Column::Status.eq("connected"))
            .filter(
                Condition::any()
                    .add(integration::Column::LastSyncedAt.is_null())
                    .add(integration::Column::LastSyncedAt.lt(cutoff)),
            )
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn stamp_synced(
        &self,
        integration: IntegrationModel,
        at: DateTime<Utc>,
    ) -> Result<IntegrationModel, RepositoryError> {
        let mut active = integration.into_active_model();
        active.last_synced_at = Set(Some(at.into()));
        active.updated_at = Set(at.into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

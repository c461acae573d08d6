//! # Ad Account Repository

use crate::error::RepositoryError;
use crate::models::ad_account::{self, Entity as AdAccount, Model as AdAccountModel};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};
use uuid::Uuid;

/// Repository for AdAccount database operations
pub struct AdAccountRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AdAccountRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn list_by_account(
        &self,
        account_id: Uuid,
        platform: Option<&str>,
    ) -> Result<Vec<AdAccountModel>, RepositoryError> {
        let mut query = AdAccount::find().filter(ad_account::Column::AccountId.eq(account_id));
        if let Some(platform) = platform {
            query = query.filter(ad_account::Column::Platform.eq(platform));
        }

        query
            .order_by_asc(ad_account::Column::Name)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_in_account(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<AdAccountModel, RepositoryError> {
        AdAccount::find_by_id(id)
            .filter(ad_account::Column::AccountId.eq(account_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Ad account"))
    }

    pub async fn update_status(
        &self,
        ad_account: AdAccountModel,
        status: &str,
    ) -> Result<AdAccountModel, RepositoryError> {
        let mut active = ad_account.into_active_model();
        active.status = Set(status.to_string());
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Disconnect every ad account discovered through `integration_id`
    pub async fn disconnect_for_integration(
        &self,
        integration_id: Uuid,
    ) -> Result<u64, RepositoryError> {
        let result = AdAccount::update_many()
            .col_expr(ad_account::Column::Status, Expr::value("disconnected"))
            .col_expr(
                ad_account::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(ad_account::Column::IntegrationId.eq(integration_id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }

    /// Stamp `last_synced_at` on the integration's active ad accounts
    pub async fn stamp_synced_for_integration(
        &self,
        integration_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let at: sea_orm::prelude::DateTimeWithTimeZone = at.into();
        let result = AdAccount::update_many()
            .col_expr(ad_account::Column::LastSyncedAt, Expr::value(at))
            .col_expr(ad_account::Column::UpdatedAt, Expr::value(at))
            .filter(ad_account::Column::IntegrationId.eq(integration_id))
            .filter(ad_account::Column::Status.eq("active"))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }
}

//! # Custom Metric Repository

use crate::error::RepositoryError;
use crate::models::custom_metric::{
    self, ActiveModel, Entity as CustomMetric, Model as CustomMetricModel,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

/// Request data for creating a custom metric
#[derive(Debug, Clone)]
pub struct CreateCustomMetricRequest {
    pub account_id: Uuid,
    pub name: String,
    pub key: String,
    pub formula: String,
    pub format: String,
    pub description: Option<String>,
}

/// Changes accepted by [`CustomMetricRepository::update`]
#[derive(Debug, Clone, Default)]
pub struct CustomMetricUpdate {
    pub name: Option<String>,
    pub formula: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,
}

/// Repository for CustomMetric database operations
pub struct CustomMetricRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> CustomMetricRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn list_by_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<CustomMetricModel>, RepositoryError> {
        CustomMetric::find()
            .filter(custom_metric::Column::AccountId.eq(account_id))
            .order_by_asc(custom_metric::Column::Name)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_in_account(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<CustomMetricModel, RepositoryError> {
        CustomMetric::find_by_id(id)
            .filter(custom_metric::Column::AccountId.eq(account_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Custom metric"))
    }

    pub async fn find_by_key(
        &self,
        account_id: Uuid,
        key: &str,
    ) -> Result<Option<CustomMetricModel>, RepositoryError> {
        CustomMetric::find()
            .filter(custom_metric::Column::AccountId.eq(account_id))
            .filter(custom_metric::Column::Key.eq(key))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count_by_account(&self, account_id: Uuid) -> Result<u64, RepositoryError> {
        CustomMetric::find()
            .filter(custom_metric::Column::AccountId.eq(account_id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(
        &self,
        request: CreateCustomMetricRequest,
    ) -> Result<CustomMetricModel, RepositoryError> {
        let now = Utc::now();
        let metric = ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(request.account_id),
            name: Set(request.name),
            key: Set(request.key),
            formula: Set(request.formula),
            format: Set(request.format),
            description: Set(request.description),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        metric.insert(self.db).await.map_err(|err| {
            if matches!(
                err.sql_err(),
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
            ) {
                RepositoryError::Conflict("A custom metric with this key already exists".to_string())
            } else {
                RepositoryError::database_error(err)
            }
        })
    }

    pub async fn update(
        &self,
        metric: CustomMetricModel,
        update: CustomMetricUpdate,
    ) -> Result<CustomMetricModel, RepositoryError> {
        let mut active = metric.into_active_model();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(formula) = update.formula {
            active.formula = Set(formula);
        }
        if let Some(format) = update.format {
            active.format = Set(format);
        }
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, metric: CustomMetricModel) -> Result<(), RepositoryError> {
        metric
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

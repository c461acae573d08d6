//! # Custom Report Repository

use crate::error::RepositoryError;
use crate::models::custom_report::{
    self, ActiveModel, Entity as CustomReport, Model as CustomReportModel,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value;
use uuid::Uuid;

/// Request data for creating a custom report
#[derive(Debug, Clone)]
pub struct CreateCustomReportRequest {
    pub account_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub filters: Value,
    pub date_range: String,
}

/// Changes accepted by [`CustomReportRepository::update`]
#[derive(Debug, Clone, Default)]
pub struct CustomReportUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub metrics: Option<Vec<String>>,
    pub dimensions: Option<Vec<String>>,
    pub filters: Option<Value>,
    pub date_range: Option<String>,
}

/// Repository for CustomReport database operations
pub struct CustomReportRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> CustomReportRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn list_by_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<CustomReportModel>, RepositoryError> {
        CustomReport::find()
            .filter(custom_report::Column::AccountId.eq(account_id))
            .order_by_asc(custom_report::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_in_account(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<CustomReportModel, RepositoryError> {
        CustomReport::find_by_id(id)
            .filter(custom_report::Column::AccountId.eq(account_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Custom report"))
    }

    pub async fn count_by_account(&self, account_id: Uuid) -> Result<u64, RepositoryError> {
        CustomReport::find()
            .filter(custom_report::Column::AccountId.eq(account_id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(
        &self,
        request: CreateCustomReportRequest,
    ) -> Result<CustomReportModel, RepositoryError> {
        let now = Utc::now();
        let report = ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(request.account_id),
            created_by: Set(request.created_by),
            name: Set(request.name),
            description: Set(request.description),
            metrics: Set(Value::from(request.metrics)),
            dimensions: Set(Value::from(request.dimensions)),
            filters: Set(request.filters),
            date_range: Set(request.date_range),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        report
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        report: CustomReportModel,
        update: CustomReportUpdate,
    ) -> Result<CustomReportModel, RepositoryError> {
        let mut active = report.into_active_model();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }
        if let Some(metrics) = update.metrics {
            active.metrics = Set(Value::from(metrics));
        }
        if let Some(dimensions) = update.dimensions {
            active.dimensions = Set(Value::from(dimensions));
        }
        if let Some(filters) = update.filters {
            active.filters = Set(filters);
        }
        if let Some(date_range) = update.date_range {
            active.date_range = Set(date_range);
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, report: CustomReportModel) -> Result<(), RepositoryError> {
        report
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

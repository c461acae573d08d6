//! # Report Template Repository
//!
//! Templates are either system-wide (`account_id IS NULL`) or owned by one
//! account. An account sees both kinds.

use crate::error::RepositoryError;
use crate::models::report_template::{
    self, ActiveModel, Entity as ReportTemplate, Model as ReportTemplateModel,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Condition,
};
use serde_json::Value;
use uuid::Uuid;

/// Request data for inserting a template
#[derive(Debug, Clone)]
pub struct CreateTemplateRequest {
    pub account_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub config: Value,
}

/// Repository for ReportTemplate database operations
pub struct ReportTemplateRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ReportTemplateRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    fn visible_to(account_id: Uuid) -> Condition {
        Condition::any()
            .add(report_template::Column::AccountId.is_null())
            .add(report_template::Column::AccountId.eq(account_id))
    }

    pub async fn list_visible(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<ReportTemplateModel>, RepositoryError> {
        ReportTemplate::find()
            .filter(Self::visible_to(account_id))
            .order_by_desc(report_template::Column::IsSystem)
            .order_by_asc(report_template::Column::Name)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_visible(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<ReportTemplateModel, RepositoryError> {
        ReportTemplate::find_by_id(id)
            .filter(Self::visible_to(account_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Report template"))
    }

    pub async fn find_system_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ReportTemplateModel>, RepositoryError> {
        ReportTemplate::find()
            .filter(report_template::Column::AccountId.is_null())
            .filter(report_template::Column::Name.eq(name))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(
        &self,
        request: CreateTemplateRequest,
    ) -> Result<ReportTemplateModel, RepositoryError> {
        let template = ActiveModel {
            id: Set(Uuid::new_v4()),
            is_system: Set(request.account_id.is_none()),
            account_id: Set(request.account_id),
            name: Set(request.name),
            description: Set(request.description),
            category: Set(request.category),
            config: Set(request.config),
            created_at: Set(Utc::now().into()),
        };

        template
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

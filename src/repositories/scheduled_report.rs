//! # Scheduled Report Repository

use crate::error::RepositoryError;
use crate::models::scheduled_report::{
    self, ActiveModel, Entity as ScheduledReport, Model as ScheduledReportModel,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value;
use uuid::Uuid;

/// Request data for creating a scheduled report
#[derive(Debug, Clone)]
pub struct CreateScheduledReportRequest {
    pub account_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub report_type: String,
    pub frequency: String,
    pub recipients: Vec<String>,
    pub next_run_at: DateTime<Utc>,
}

/// Changes accepted by [`ScheduledReportRepository::update`]
#[derive(Debug, Clone, Default)]
pub struct ScheduledReportUpdate {
    pub name: Option<String>,
    pub report_type: Option<String>,
    pub frequency: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub next_run_at: Option<DateTime<Utc>>,
}

/// Repository for ScheduledReport database operations
pub struct ScheduledReportRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ScheduledReportRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn list_by_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<ScheduledReportModel>, RepositoryError> {
        ScheduledReport::find()
            .filter(scheduled_report::Column::AccountId.eq(account_id))
            .order_by_asc(scheduled_report::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_in_account(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<ScheduledReportModel, RepositoryError> {
        ScheduledReport::find_by_id(id)
            .filter(scheduled_report::Column::AccountId.eq(account_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Scheduled report"))
    }

    pub async fn count_by_account(&self, account_id: Uuid) -> Result<u64, RepositoryError> {
        ScheduledReport::find()
            .filter(scheduled_report::Column::AccountId.eq(account_id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(
        &self,
        request: CreateScheduledReportRequest,
    ) -> Result<ScheduledReportModel, RepositoryError> {
        let now = Utc::now();
        let report = ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(request.account_id),
            created_by: Set(request.created_by),
            name: Set(request.name),
            report_type: Set(request.report_type),
            frequency: Set(request.frequency),
            recipients: Set(Value::from(request.recipients)),
            is_active: Set(true),
            last_sent_at: Set(None),
            next_run_at: Set(request.next_run_at.into()),
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
        report: ScheduledReportModel,
        update: ScheduledReportUpdate,
    ) -> Result<ScheduledReportModel, RepositoryError> {
        let mut active = report.into_active_model();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(report_type) = update.report_type {
            active.report_type = Set(report_type);
        }
        if let Some(frequency) = update.frequency {
            active.frequency = Set(frequency);
        }
        if let Some(recipients) = update.recipients {
            active.recipients = Set(Value::from(recipients));
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(next_run_at) = update.next_run_at {
            active.next_run_at = Set(next_run_at.into());
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, report: ScheduledReportModel) -> Result<(), RepositoryError> {
        report
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    /// Active reports across all accounts whose next run is at or before `now`
    pub async fn list_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledReportModel>, RepositoryError> {
        ScheduledReport::find()
            .filter(scheduled_report::Column::IsActive.eq(true))
            .filter(scheduled_report::Column::NextRunAt.lte(now))
            .order_by_asc(scheduled_report::Column::NextRunAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Record a send and move the schedule forward
    pub async fn mark_sent(
        &self,
        report: ScheduledReportModel,
        sent_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<ScheduledReportModel, RepositoryError> {
        let mut active = report.into_active_model();
        active.last_sent_at = Set(Some(sent_at.into()));
        active.next_run_at = Set(next_run_at.into());
        active.updated_at = Set(sent_at.into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

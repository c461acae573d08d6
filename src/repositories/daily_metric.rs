//! # Daily Metrics Repository

use crate::error::RepositoryError;
use crate::models::daily_metric::{self, ActiveModel, Entity as DailyMetric, Model as DailyMetricModel};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

/// Values written for one (account, date) rollup row
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailyValues {
    pub revenue: f64,
    pub orders_count: i64,
    pub ad_spend: f64,
    pub new_customers: i64,
    pub impressions: i64,
    pub clicks: i64,
}

/// Repository for DailyMetric database operations
pub struct DailyMetricRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> DailyMetricRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn list_range(
        &self,
        account_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyMetricModel>, RepositoryError> {
        DailyMetric::find()
            .filter(daily_metric::Column::AccountId.eq(account_id))
            .filter(daily_metric::Column::Date.between(start, end))
            .order_by_asc(daily_metric::Column::Date)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Insert or overwrite the rollup row for `(account_id, date)`
    pub async fn upsert(
        &self,
        account_id: Uuid,
        date: NaiveDate,
        values: DailyValues,
    ) -> Result<DailyMetricModel, RepositoryError> {
        let existing = DailyMetric::find()
            .filter(daily_metric::Column::AccountId.eq(account_id))
            .filter(daily_metric::Column::Date.eq(date))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let now = Utc::now();
        match existing {
            Some(row) => {
                let mut active = row.into_active_model();
                active.revenue = Set(values.revenue);
                active.orders_count = Set(values.orders_count);
                active.ad_spend = Set(values.ad_spend);
                active.new_customers = Set(values.new_customers);
                active.impressions = Set(values.impressions);
                active.clicks = Set(values.clicks);
                active.updated_at = Set(now.into());
                active
                    .update(self.db)
                    .await
                    .map_err(RepositoryError::database_error)
            }
            None => {
                let row = ActiveModel {
                    id: Set(Uuid::new_v4()),
                    account_id: Set(account_id),
                    date: Set(date),
                    revenue: Set(values.revenue),
                    orders_count: Set(values.orders_count),
                    ad_spend: Set(values.ad_spend),
                    new_customers: Set(values.new_customers),
                    impressions: Set(values.impressions),
                    clicks: Set(values.clicks),
                    updated_at: Set(now.into()),
                };
                row.insert(self.db)
                    .await
                    .map_err(RepositoryError::database_error)
            }
        }
    }
}

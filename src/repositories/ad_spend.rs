//! # Ad Spend Repository
//!
//! Aggregations over daily per-campaign ad spend facts.

use crate::error::RepositoryError;
use crate::models::ad_spend::{self, Entity as AdSpend, Model as AdSpendModel};
use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Select,
    sea_query::{Alias, Expr, Func, SimpleExpr},
};
use uuid::Uuid;

/// Spend-side totals for a date range
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpendTotals {
    pub spend: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub conversion_value: f64,
}

/// Spend totals for one campaign
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct CampaignTotals {
    pub platform: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub spend: Option<f64>,
    pub impressions: Option<i64>,
    pub clicks: Option<i64>,
    pub conversions: Option<i64>,
    pub conversion_value: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct SpendSums {
    spend: Option<f64>,
    impressions: Option<i64>,
    clicks: Option<i64>,
    conversions: Option<i64>,
    conversion_value: Option<f64>,
}

fn sum_f64(column: ad_spend::Column) -> SimpleExpr {
    Func::sum(Expr::col(column)).into()
}

// Postgres widens SUM(bigint) to numeric
fn sum_i64(column: ad_spend::Column) -> SimpleExpr {
    Func::cast_as(Func::sum(Expr::col(column)), Alias::new("bigint")).into()
}

/// Repository for AdSpend database operations
pub struct AdSpendRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AdSpendRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    fn in_range(account_id: Uuid, start: NaiveDate, end: NaiveDate) -> Select<AdSpend> {
        AdSpend::find()
            .filter(ad_spend::Column::AccountId.eq(account_id))
            .filter(ad_spend::Column::Date.between(start, end))
    }

    pub async fn totals(
        &self,
        account_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SpendTotals, RepositoryError> {
        let sums = Self::in_range(account_id, start, end)
            .select_only()
            .column_as(sum_f64(ad_spend::Column::Spend), "spend")
            .column_as(sum_i64(ad_spend::Column::Impressions), "impressions")
            .column_as(sum_i64(ad_spend::Column::Clicks), "clicks")
            .column_as(sum_i64(ad_spend::Column::Conversions), "conversions")
            .column_as(sum_f64(ad_spend::Column::ConversionValue), "conversion_value")
            .into_model::<SpendSums>()
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(sums
            .map(|s| SpendTotals {
                spend: s.spend.unwrap_or(0.0),
                impressions: s.impressions.unwrap_or(0),
                clicks: s.clicks.unwrap_or(0),
                conversions: s.conversions.unwrap_or(0),
                conversion_value: s.conversion_value.unwrap_or(0.0),
            })
            .unwrap_or_default())
    }

    /// Per-campaign totals, optionally restricted to one platform
    pub async fn campaign_totals(
        &self,
        account_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        platform: Option<&str>,
    ) -> Result<Vec<CampaignTotals>, RepositoryError> {
        let mut query = Self::in_range(account_id, start, end);
        if let Some(platform) = platform {
            query = query.filter(ad_spend::Column::Platform.eq(platform));
        }

        query
            .select_only()
            .column(ad_spend::Column::Platform)
            .column(ad_spend::Column::CampaignId)
            .column(ad_spend::Column::CampaignName)
            .column_as(sum_f64(ad_spend::Column::Spend), "spend")
            .column_as(sum_i64(ad_spend::Column::Impressions), "impressions")
            .column_as(sum_i64(ad_spend::Column::Clicks), "clicks")
            .column_as(sum_i64(ad_spend::Column::Conversions), "conversions")
            .column_as(sum_f64(ad_spend::Column::ConversionValue), "conversion_value")
            .group_by(ad_spend::Column::Platform)
            .group_by(ad_spend::Column::CampaignId)
            .group_by(ad_spend::Column::CampaignName)
            .into_model::<CampaignTotals>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Raw rows in the range, for daily rollups
    pub async fn list_in_range(
        &self,
        account_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AdSpendModel>, RepositoryError> {
        Self::in_range(account_id, start, end)
            .order_by_asc(ad_spend::Column::Date)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

//! Marketing metrics over date ranges.
//!
//! Order windows are half-open UTC instants `[start 00:00, end + 1 day 00:00)`;
//! ad spend facts are calendar dates in `[start, end]`.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthUser, Permission};
use crate::cursor::{OrderCursor, encode_cursor};
use crate::error::{ApiError, bad_request};
use crate::models::order::Model as OrderModel;
use crate::models::order_item::Model as OrderItemModel;
use crate::repositories::ad_spend::CampaignTotals;
use crate::repositories::daily_metric::DailyValues;
use crate::repositories::{
    AdSpendRepository, DailyMetricRepository, OrderRepository,
};
use sea_orm::DatabaseConnection;

pub const MAX_RANGE_DAYS: i64 = 366;
pub const DEFAULT_RANGE_DAYS: i64 = 30;

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Validate explicit bounds, defaulting to the last 30 days ending today
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, ApiError> {
        let end = end.unwrap_or(today);
        let start = match start {
            Some(start) => start,
            None => end
                .checked_sub_days(Days::new(DEFAULT_RANGE_DAYS as u64 - 1))
                .ok_or_else(out_of_range)?,
        };

        if start > end {
            return Err(bad_request("start_date must be on or before end_date"));
        }
        let range = Self { start, end };
        if range.days() > MAX_RANGE_DAYS {
            return Err(bad_request("date range cannot exceed 366 days"));
        }
        // The comparison window and the exclusive end instant must be representable
        end.succ_opt().ok_or_else(out_of_range)?;
        start
            .checked_sub_days(Days::new(range.days() as u64))
            .ok_or_else(out_of_range)?;
        Ok(range)
    }

    /// Relative range keyword as stored on custom reports
    pub fn from_keyword(keyword: &str, today: NaiveDate) -> Result<Self, ApiError> {
        let start = match keyword {
            "last_7_days" => today - Duration::days(6),
            "last_30_days" => today - Duration::days(29),
            "last_90_days" => today - Duration::days(89),
            "month_to_date" => today.with_day(1).unwrap_or(today),
            "year_to_date" => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
            _ => {
                return Err(bad_request(
                    "date_range must be one of last_7_days, last_30_days, last_90_days, month_to_date, year_to_date",
                ));
            }
        };
        Ok(Self { start, end: today })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Equal-length range ending the day before this one starts
    ///
    /// Saturates at `NaiveDate::MIN`; `resolve` rejects ranges that would.
    pub fn previous(&self) -> Self {
        let end = self.start.pred_opt().unwrap_or(NaiveDate::MIN);
        Self {
            start: end
                .checked_sub_days(Days::new(self.days() as u64 - 1))
                .unwrap_or(NaiveDate::MIN),
            end,
        }
    }

    /// Half-open UTC instant window covering every day in the range
    pub fn instant_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = self
            .end
            .succ_opt()
            .unwrap_or(NaiveDate::MAX)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc();
        (start, end)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        self.start.iter_days().take(self.days() as usize)
    }
}

fn out_of_range() -> ApiError {
    bad_request("date out of range")
}

pub const REPORT_DATE_RANGES: [&str; 5] = [
    "last_7_days",
    "last_30_days",
    "last_90_days",
    "month_to_date",
    "year_to_date",
];

/// Headline metrics for a range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricsSummary {
    pub revenue: f64,
    pub orders: u64,
    pub aov: f64,
    pub ad_spend: f64,
    pub roas: f64,
    pub new_customers: u64,
    pub impressions: i64,
    pub clicks: i64,
    /// clicks / impressions
    pub ctr: f64,
    /// ad_spend / clicks
    pub cpc: f64,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

impl MetricsSummary {
    pub fn compute(
        revenue: f64,
        orders: u64,
        new_customers: u64,
        ad_spend: f64,
        impressions: i64,
        clicks: i64,
    ) -> Self {
        Self {
            revenue,
            orders,
            aov: ratio(revenue, orders as f64),
            ad_spend,
            roas: ratio(revenue, ad_spend),
            new_customers,
            impressions,
            clicks,
            ctr: ratio(clicks as f64, impressions as f64),
            cpc: ratio(ad_spend, clicks as f64),
        }
    }

    /// Values keyed by base metric name, for formula evaluation
    pub fn as_values(&self) -> HashMap<&'static str, f64> {
        HashMap::from([
            ("revenue", self.revenue),
            ("orders", self.orders as f64),
            ("aov", self.aov),
            ("ad_spend", self.ad_spend),
            ("roas", self.roas),
            ("new_customers", self.new_customers as f64),
            ("impressions", self.impressions as f64),
            ("clicks", self.clicks as f64),
            ("ctr", self.ctr),
            ("cpc", self.cpc),
        ])
    }
}

/// Percent change per metric; `None` when the previous value is zero
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricsChange {
    pub revenue: Option<f64>,
    pub orders: Option<f64>,
    pub aov: Option<f64>,
    pub ad_spend: Option<f64>,
    pub roas: Option<f64>,
    pub new_customers: Option<f64>,
    pub impressions: Option<f64>,
    pub clicks: Option<f64>,
    pub ctr: Option<f64>,
    pub cpc: Option<f64>,
}

pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        None
    } else {
        Some((current - previous) / previous * 100.0)
    }
}

impl MetricsChange {
    pub fn between(current: &MetricsSummary, previous: &MetricsSummary) -> Self {
        Self {
            revenue: percent_change(current.revenue, previous.revenue),
            orders: percent_change(current.orders as f64, previous.orders as f64),
            aov: percent_change(current.aov, previous.aov),
            ad_spend: percent_change(current.ad_spend, previous.ad_spend),
            roas: percent_change(current.roas, previous.roas),
            new_customers: percent_change(
                current.new_customers as f64,
                previous.new_customers as f64,
            ),
            impressions: percent_change(current.impressions as f64, previous.impressions as f64),
            clicks: percent_change(current.clicks as f64, previous.clicks as f64),
            ctr: percent_change(current.ctr, previous.ctr),
            cpc: percent_change(current.cpc, previous.cpc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SummaryComparison {
    pub range: DateRange,
    pub summary: MetricsSummary,
    pub change: MetricsChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub revenue: f64,
    pub orders: i64,
    pub ad_spend: f64,
    pub roas: f64,
    pub new_customers: i64,
    pub impressions: i64,
    pub clicks: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CampaignMetrics {
    pub platform: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub spend: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub conversion_value: f64,
    pub roas: f64,
}

impl From<CampaignTotals> for CampaignMetrics {
    fn from(totals: CampaignTotals) -> Self {
        let spend = totals.spend.unwrap_or(0.0);
        let conversion_value = totals.conversion_value.unwrap_or(0.0);
        Self {
            platform: totals.platform,
            campaign_id: totals.campaign_id,
            campaign_name: totals.campaign_name,
            spend,
            impressions: totals.impressions.unwrap_or(0),
            clicks: totals.clicks.unwrap_or(0),
            conversions: totals.conversions.unwrap_or(0),
            conversion_value,
            roas: ratio(conversion_value, spend),
        }
    }
}

/// One page of orders
#[derive(Debug, Clone)]
pub struct OrdersPage {
    pub orders: Vec<(OrderModel, Vec<OrderItemModel>)>,
    pub next_cursor: Option<String>,
}

pub const DEFAULT_ORDERS_LIMIT: u64 = 25;
pub const MAX_ORDERS_LIMIT: u64 = 100;

pub struct MetricsService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> MetricsService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Headline metrics for one account and range
    pub async fn summary_for(
        &self,
        account_id: Uuid,
        range: DateRange,
    ) -> Result<MetricsSummary, ApiError> {
        let (start, end) = range.instant_bounds();
        let revenue = OrderRepository::new(self.db)
            .revenue_totals(account_id, start, end)
            .await?;
        let spend = AdSpendRepository::new(self.db)
            .totals(account_id, range.start, range.end)
            .await?;

        Ok(MetricsSummary::compute(
            revenue.revenue,
            revenue.orders,
            revenue.new_customers,
            spend.spend,
            spend.impressions,
            spend.clicks,
        ))
    }

    pub async fn summary(
        &self,
        auth: &AuthUser,
        range: DateRange,
        compare: bool,
    ) -> Result<(MetricsSummary, Option<SummaryComparison>), ApiError> {
        auth.require(Permission::ViewMetrics)?;

        let current = self.summary_for(auth.account_id, range).await?;
        if !compare {
            return Ok((current, None));
        }

        let previous_range = range.previous();
        let previous = self.summary_for(auth.account_id, previous_range).await?;
        Ok((
            current,
            Some(SummaryComparison {
                range: previous_range,
                change: MetricsChange::between(&current, &previous),
                summary: previous,
            }),
        ))
    }

    /// One point per day in the range; days without a rollup are zero
    pub async fn daily(
        &self,
        auth: &AuthUser,
        range: DateRange,
    ) -> Result<Vec<DailyPoint>, ApiError> {
        auth.require(Permission::ViewMetrics)?;

        let rows = DailyMetricRepository::new(self.db)
            .list_range(auth.account_id, range.start, range.end)
            .await?;
        let by_date: HashMap<NaiveDate, _> = rows.into_iter().map(|row| (row.date, row)).collect();

        Ok(range
            .dates()
            .map(|date| match by_date.get(&date) {
                Some(row) => DailyPoint {
                    date,
                    revenue: row.revenue,
                    orders: row.orders_count,
                    ad_spend: row.ad_spend,
                    roas: ratio(row.revenue, row.ad_spend),
                    new_customers: row.new_customers,
                    impressions: row.impressions,
                    clicks: row.clicks,
                },
                None => DailyPoint {
                    date,
                    revenue: 0.0,
                    orders: 0,
                    ad_spend: 0.0,
                    roas: 0.0,
                    new_customers: 0,
                    impressions: 0,
                    clicks: 0,
                },
            })
            .collect())
    }

    /// Per-campaign totals sorted by spend, highest first
    pub async fn campaigns(
        &self,
        auth: &AuthUser,
        range: DateRange,
        platform: Option<&str>,
    ) -> Result<Vec<CampaignMetrics>, ApiError> {
        auth.require(Permission::ViewMetrics)?;

        let mut campaigns: Vec<CampaignMetrics> = AdSpendRepository::new(self.db)
            .campaign_totals(auth.account_id, range.start, range.end, platform)
            .await?
            .into_iter()
            .map(CampaignMetrics::from)
            .collect();

        campaigns.sort_by(|a, b| {
            b.spend
                .total_cmp(&a.spend)
                .then_with(|| a.campaign_name.cmp(&b.campaign_name))
        });
        Ok(campaigns)
    }

    pub async fn orders(
        &self,
        auth: &AuthUser,
        range: DateRange,
        limit: Option<u64>,
        cursor: Option<OrderCursor>,
    ) -> Result<OrdersPage, ApiError> {
        auth.require(Permission::ViewMetrics)?;

        let limit = limit.unwrap_or(DEFAULT_ORDERS_LIMIT);
        if !(1..=MAX_ORDERS_LIMIT).contains(&limit) {
            return Err(bad_request("limit must be between 1 and 100"));
        }

        let (start, end) = range.instant_bounds();
        let repository = OrderRepository::new(self.db);
        let mut orders = repository
            .page(auth.account_id, start, end, limit, cursor)
            .await?;

        let has_more = orders.len() as u64 > limit;
        orders.truncate(limit as usize);
        let next_cursor = if has_more {
            orders
                .last()
                .map(|last| encode_cursor(&last.ordered_at.with_timezone(&Utc), &last.id))
        } else {
            None
        };

        let ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
        let mut items = repository.items_for_orders(auth.account_id, &ids).await?;

        Ok(OrdersPage {
            orders: orders
                .into_iter()
                .map(|order| {
                    let order_items = items.remove(&order.id).unwrap_or_default();
                    (order, order_items)
                })
                .collect(),
            next_cursor,
        })
    }

    /// Recompute the daily rollup for every day in the range.
    ///
    /// Returns the number of rows written.
    pub async fn rebuild_daily(&self, account_id: Uuid, range: DateRange) -> Result<u64, ApiError> {
        let (start, end) = range.instant_bounds();
        let orders = OrderRepository::new(self.db)
            .list_revenue_orders(account_id, start, end)
            .await?;
        let spend_rows = AdSpendRepository::new(self.db)
            .list_in_range(account_id, range.start, range.end)
            .await?;

        let mut days: BTreeMap<NaiveDate, DailyValues> =
            range.dates().map(|date| (date, DailyValues::default())).collect();

        for order in orders {
            let date = order.ordered_at.with_timezone(&Utc).date_naive();
            if let Some(day) = days.get_mut(&date) {
                day.revenue += order.total_price;
                day.orders_count += 1;
                if order.is_new_customer {
                    day.new_customers += 1;
                }
            }
        }
        for row in spend_rows {
            if let Some(day) = days.get_mut(&row.date) {
                day.ad_spend += row.spend;
                day.impressions += row.impressions;
                day.clicks += row.clicks;
            }
        }

        let repository = DailyMetricRepository::new(self.db);
        let mut written = 0;
        for (date, values) in days {
            repository.upsert(account_id, date, values).await?;
            written += 1;
        }

        tracing::info!(%account_id, start = %range.start, end = %range.end, written, "Rebuilt daily metrics");
        Ok(written)
    }

    pub async fn rebuild(&self, auth: &AuthUser, range: DateRange) -> Result<u64, ApiError> {
        auth.require(Permission::ManageIntegrations)?;
        self.rebuild_daily(auth.account_id, range).await
    }
}

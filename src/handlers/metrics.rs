//! # Metrics Handlers
//!
//! Dashboard read endpoints. Every range is inclusive and limited to 366
//! days; without explicit dates the last 30 days are used.

use axum::{extract::State, response::Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthUser;
use crate::cursor::decode_cursor;
use crate::error::ApiError;
use crate::handlers::types::{ApiJson, ApiQuery, ListResponse, OrderInfo, PaginatedResponse};
use crate::server::AppState;
use crate::services::MetricsService;
use crate::services::metrics::{
    CampaignMetrics, DailyPoint, DateRange, MetricsSummary, SummaryComparison,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// First day, inclusive (YYYY-MM-DD)
    pub start_date: Option<NaiveDate>,
    /// Last day, inclusive (YYYY-MM-DD)
    pub end_date: Option<NaiveDate>,
}

fn resolve_range(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<DateRange, ApiError> {
    DateRange::resolve(start_date, end_date, Utc::now().date_naive())
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Include the preceding period of equal length
    #[serde(default)]
    pub compare: bool,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CampaignsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Only campaigns of this platform
    pub platform: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrdersQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Page size, 1 to 100 (default 25)
    pub limit: Option<u64>,
    /// Opaque cursor from the previous page
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    pub range: DateRange,
    pub summary: MetricsSummary,
    /// Present when `compare=true`
    pub previous: Option<SummaryComparison>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct RebuildRequest {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RebuildResponse {
    pub range: DateRange,
    /// Daily rows written
    pub days: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/metrics/summary",
    security(("bearer_auth" = [])),
    params(SummaryQuery),
    responses(
        (status = 200, description = "Headline metrics", body = SummaryResponse),
        (status = 400, description = "Invalid date range", body = ApiError)
    ),
    tag = "metrics"
)]
pub async fn summary(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let range = resolve_range(query.start_date, query.end_date)?;
    let (summary, previous) = MetricsService::new(&state.db)
        .summary(&auth, range, query.compare)
        .await?;
    Ok(Json(SummaryResponse {
        range,
        summary,
        previous,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/metrics/daily",
    security(("bearer_auth" = [])),
    params(RangeQuery),
    responses(
        (status = 200, description = "One point per day", body = ListResponse<DailyPoint>),
        (status = 400, description = "Invalid date range", body = ApiError)
    ),
    tag = "metrics"
)]
pub async fn daily(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> Result<Json<ListResponse<DailyPoint>>, ApiError> {
    let points = MetricsService::new(&state.db)
        .daily(&auth, resolve_range(query.start_date, query.end_date)?)
        .await?;
    Ok(Json(ListResponse::new(points)))
}

#[utoipa::path(
    get,
    path = "/api/v1/metrics/campaigns",
    security(("bearer_auth" = [])),
    params(CampaignsQuery),
    responses(
        (status = 200, description = "Campaign totals by spend", body = ListResponse<CampaignMetrics>),
        (status = 400, description = "Invalid date range", body = ApiError)
    ),
    tag = "metrics"
)]
pub async fn campaigns(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<CampaignsQuery>,
) -> Result<Json<ListResponse<CampaignMetrics>>, ApiError> {
    let range = resolve_range(query.start_date, query.end_date)?;
    let campaigns = MetricsService::new(&state.db)
        .campaigns(&auth, range, query.platform.as_deref())
        .await?;
    Ok(Json(ListResponse::new(campaigns)))
}

#[utoipa::path(
    get,
    path = "/api/v1/metrics/orders",
    security(("bearer_auth" = [])),
    params(OrdersQuery),
    responses(
        (status = 200, description = "Orders newest first", body = PaginatedResponse<OrderInfo>),
        (status = 400, description = "Invalid range, limit or cursor", body = ApiError)
    ),
    tag = "metrics"
)]
pub async fn orders(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<OrdersQuery>,
) -> Result<Json<PaginatedResponse<OrderInfo>>, ApiError> {
    let range = resolve_range(query.start_date, query.end_date)?;
    let cursor = query.cursor.as_deref().map(decode_cursor).transpose()?;

    let page = MetricsService::new(&state.db)
        .orders(&auth, range, query.limit, cursor)
        .await?;
    Ok(Json(PaginatedResponse::new(
        page.orders.into_iter().map(OrderInfo::from).collect(),
        page.next_cursor,
    )))
}

/// Recompute the daily rollup from orders and ad spend
#[utoipa::path(
    post,
    path = "/api/v1/metrics/rebuild",
    security(("bearer_auth" = [])),
    request_body = RebuildRequest,
    responses(
        (status = 200, description = "Rollup rebuilt", body = RebuildResponse),
        (status = 400, description = "Invalid date range", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "metrics"
)]
pub async fn rebuild(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<RebuildRequest>,
) -> Result<Json<RebuildResponse>, ApiError> {
    let range = resolve_range(request.start_date, request.end_date)?;
    let days = MetricsService::new(&state.db).rebuild(&auth, range).await?;
    Ok(Json(RebuildResponse { range, days }))
}

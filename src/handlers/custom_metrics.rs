//! # Custom Metric Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::types::{ApiJson, ApiQuery, CustomMetricInfo, ListResponse};
use crate::server::AppState;
use crate::services::custom_metrics::{self, CustomMetricChanges, NewCustomMetric};
use crate::services::metrics::DateRange;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateCustomMetricRequest {
    #[schema(example = "Contribution Margin")]
    pub name: String,
    #[schema(example = "(revenue - ad_spend) / revenue * 100")]
    pub formula: String,
    /// number, currency or percent (default number)
    pub format: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateCustomMetricRequest {
    pub name: Option<String>,
    pub formula: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ValueQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomMetricValueResponse {
    pub metric: CustomMetricInfo,
    pub range: DateRange,
    pub value: f64,
}

#[utoipa::path(
    get,
    path = "/api/v1/custom-metrics",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Custom metrics of the account", body = ListResponse<CustomMetricInfo>)
    ),
    tag = "custom-metrics"
)]
pub async fn list_custom_metrics(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ListResponse<CustomMetricInfo>>, ApiError> {
    let metrics = custom_metrics::list(&state.db, &auth).await?;
    Ok(Json(metrics.into_iter().collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/custom-metrics",
    security(("bearer_auth" = [])),
    request_body = CreateCustomMetricRequest,
    responses(
        (status = 201, description = "Custom metric created", body = CustomMetricInfo),
        (status = 400, description = "Invalid name, formula or format", body = ApiError),
        (status = 403, description = "Insufficient permissions or limit reached", body = ApiError),
        (status = 409, description = "Name already used", body = ApiError)
    ),
    tag = "custom-metrics"
)]
pub async fn create_custom_metric(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<CreateCustomMetricRequest>,
) -> Result<(StatusCode, Json<CustomMetricInfo>), ApiError> {
    let metric = custom_metrics::create(
        &state.db,
        &auth,
        NewCustomMetric {
            name: request.name,
            formula: request.formula,
            format: request.format,
            description: request.description,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(metric.into())))
}

#[utoipa::path(
    patch,
    path = "/api/v1/custom-metrics/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Custom metric id")),
    request_body = UpdateCustomMetricRequest,
    responses(
        (status = 200, description = "Updated custom metric", body = CustomMetricInfo),
        (status = 400, description = "Invalid name, formula or format", body = ApiError),
        (status = 404, description = "Custom metric not found", body = ApiError),
        (status = 409, description = "Name already used", body = ApiError)
    ),
    tag = "custom-metrics"
)]
pub async fn update_custom_metric(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateCustomMetricRequest>,
) -> Result<Json<CustomMetricInfo>, ApiError> {
    let metric = custom_metrics::update(
        &state.db,
        &auth,
        id,
        CustomMetricChanges {
            name: request.name,
            formula: request.formula,
            format: request.format,
            description: request.description,
        },
    )
    .await?;
    Ok(Json(metric.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/custom-metrics/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Custom metric id")),
    responses(
        (status = 204, description = "Custom metric deleted"),
        (status = 404, description = "Custom metric not found", body = ApiError)
    ),
    tag = "custom-metrics"
)]
pub async fn delete_custom_metric(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    custom_metrics::delete(&state.db, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Evaluate a custom metric over a date range
#[utoipa::path(
    get,
    path = "/api/v1/custom-metrics/{id}/value",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Custom metric id"), ValueQuery),
    responses(
        (status = 200, description = "Metric value", body = CustomMetricValueResponse),
        (status = 400, description = "Invalid date range", body = ApiError),
        (status = 404, description = "Custom metric not found", body = ApiError)
    ),
    tag = "custom-metrics"
)]
pub async fn custom_metric_value(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ApiQuery(query): ApiQuery<ValueQuery>,
) -> Result<Json<CustomMetricValueResponse>, ApiError> {
    let range = DateRange::resolve(query.start_date, query.end_date, Utc::now().date_naive())?;
    let evaluated = custom_metrics::evaluate(&state.db, &auth, id, range).await?;
    Ok(Json(CustomMetricValueResponse {
        metric: evaluated.metric.into(),
        range: evaluated.range,
        value: evaluated.value,
    }))
}

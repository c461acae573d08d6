//! # Report Handlers
//!
//! Scheduled email reports, saved custom reports and the template
//! gallery custom reports can be created from.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::types::{
    ApiJson, CustomReportInfo, ListResponse, ReportTemplateInfo, ScheduledReportInfo,
};
use crate::server::AppState;
use crate::services::metrics::DateRange;
use crate::services::reports::{
    self, CustomReportChanges, NewCustomReport, NewScheduledReport, ScheduledReportChanges,
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateScheduledReportRequest {
    #[schema(example = "Monday performance")]
    pub name: String,
    /// summary, campaigns or orders
    #[schema(example = "summary")]
    pub report_type: String,
    /// daily, weekly or monthly
    #[schema(example = "weekly")]
    pub frequency: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateScheduledReportRequest {
    pub name: Option<String>,
    pub report_type: Option<String>,
    pub frequency: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateCustomReportRequest {
    pub name: String,
    pub description: Option<String>,
    /// Base metric names or custom metric keys
    pub metrics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[schema(value_type = Option<Object>)]
    pub filters: Option<Value>,
    #[schema(example = "last_30_days")]
    pub date_range: String,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateCustomReportRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub metrics: Option<Vec<String>>,
    pub dimensions: Option<Vec<String>>,
    #[schema(value_type = Option<Object>)]
    pub filters: Option<Value>,
    pub date_range: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportRunResponse {
    pub report: CustomReportInfo,
    pub range: DateRange,
    /// Metric name to value
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UseTemplateRequest {
    /// Defaults to the template name
    pub name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/scheduled",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Scheduled reports", body = ListResponse<ScheduledReportInfo>)
    ),
    tag = "reports"
)]
pub async fn list_scheduled_reports(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ListResponse<ScheduledReportInfo>>, ApiError> {
    let scheduled = reports::list_scheduled(&state.db, &auth).await?;
    Ok(Json(scheduled.into_iter().collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/scheduled",
    security(("bearer_auth" = [])),
    request_body = CreateScheduledReportRequest,
    responses(
        (status = 201, description = "Scheduled report created", body = ScheduledReportInfo),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Insufficient permissions or limit reached", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn create_scheduled_report(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<CreateScheduledReportRequest>,
) -> Result<(StatusCode, Json<ScheduledReportInfo>), ApiError> {
    let report = reports::create_scheduled(
        &state.db,
        &auth,
        NewScheduledReport {
            name: request.name,
            report_type: request.report_type,
            frequency: request.frequency,
            recipients: request.recipients,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(report.into())))
}

#[utoipa::path(
    patch,
    path = "/api/v1/reports/scheduled/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Scheduled report id")),
    request_body = UpdateScheduledReportRequest,
    responses(
        (status = 200, description = "Updated scheduled report", body = ScheduledReportInfo),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Scheduled report not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn update_scheduled_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateScheduledReportRequest>,
) -> Result<Json<ScheduledReportInfo>, ApiError> {
    let report = reports::update_scheduled(
        &state.db,
        &auth,
        id,
        ScheduledReportChanges {
            name: request.name,
            report_type: request.report_type,
            frequency: request.frequency,
            recipients: request.recipients,
            is_active: request.is_active,
        },
    )
    .await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reports/scheduled/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Scheduled report id")),
    responses(
        (status = 204, description = "Scheduled report deleted"),
        (status = 404, description = "Scheduled report not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn delete_scheduled_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    reports::delete_scheduled(&state.db, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/custom",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Custom reports", body = ListResponse<CustomReportInfo>)
    ),
    tag = "reports"
)]
pub async fn list_custom_reports(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ListResponse<CustomReportInfo>>, ApiError> {
    let custom = reports::list_custom(&state.db, &auth).await?;
    Ok(Json(custom.into_iter().collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/custom",
    security(("bearer_auth" = [])),
    request_body = CreateCustomReportRequest,
    responses(
        (status = 201, description = "Custom report created", body = CustomReportInfo),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Insufficient permissions or limit reached", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn create_custom_report(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<CreateCustomReportRequest>,
) -> Result<(StatusCode, Json<CustomReportInfo>), ApiError> {
    let report = reports::create_custom(
        &state.db,
        &auth,
        NewCustomReport {
            name: request.name,
            description: request.description,
            metrics: request.metrics,
            dimensions: request.dimensions,
            filters: request.filters,
            date_range: request.date_range,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(report.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/custom/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Custom report id")),
    responses(
        (status = 200, description = "Custom report", body = CustomReportInfo),
        (status = 404, description = "Custom report not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn get_custom_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomReportInfo>, ApiError> {
    Ok(Json(reports::get_custom(&state.db, &auth, id).await?.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/reports/custom/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Custom report id")),
    request_body = UpdateCustomReportRequest,
    responses(
        (status = 200, description = "Updated custom report", body = CustomReportInfo),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Custom report not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn update_custom_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateCustomReportRequest>,
) -> Result<Json<CustomReportInfo>, ApiError> {
    let report = reports::update_custom(
        &state.db,
        &auth,
        id,
        CustomReportChanges {
            name: request.name,
            description: request.description,
            metrics: request.metrics,
            dimensions: request.dimensions,
            filters: request.filters,
            date_range: request.date_range,
        },
    )
    .await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reports/custom/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Custom report id")),
    responses(
        (status = 204, description = "Custom report deleted"),
        (status = 404, description = "Custom report not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn delete_custom_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    reports::delete_custom(&state.db, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Evaluate a custom report over its relative date range
#[utoipa::path(
    post,
    path = "/api/v1/reports/custom/{id}/run",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Custom report id")),
    responses(
        (status = 200, description = "Report values", body = ReportRunResponse),
        (status = 404, description = "Custom report not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn run_custom_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportRunResponse>, ApiError> {
    let run = reports::run_custom(&state.db, &auth, id).await?;
    Ok(Json(ReportRunResponse {
        report: run.report.into(),
        range: run.range,
        values: run.values,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/templates",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "System and account templates", body = ListResponse<ReportTemplateInfo>)
    ),
    tag = "reports"
)]
pub async fn list_report_templates(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ListResponse<ReportTemplateInfo>>, ApiError> {
    let templates = reports::list_templates(&state.db, &auth).await?;
    Ok(Json(templates.into_iter().collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/templates/{id}/use",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Template id")),
    request_body = UseTemplateRequest,
    responses(
        (status = 201, description = "Custom report created from the template", body = CustomReportInfo),
        (status = 403, description = "Insufficient permissions or limit reached", body = ApiError),
        (status = 404, description = "Template not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn use_report_template(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UseTemplateRequest>,
) -> Result<(StatusCode, Json<CustomReportInfo>), ApiError> {
    let report = reports::use_template(&state.db, &auth, id, request.name).await?;
    Ok((StatusCode::CREATED, Json(report.into())))
}

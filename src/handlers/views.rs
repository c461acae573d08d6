//! # Saved View Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::types::{ApiJson, ApiQuery, ListResponse, SavedViewInfo};
use crate::server::AppState;
use crate::services::views::{self, NewView};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ViewsQuery {
    /// dashboard, campaigns, orders or reports
    pub page: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateViewRequest {
    #[schema(example = "Meta only")]
    pub name: String,
    #[schema(example = "dashboard")]
    pub page: String,
    #[schema(value_type = Option<Object>)]
    pub filters: Option<Value>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateViewRequest {
    pub name: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub filters: Option<Value>,
    pub is_default: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/v1/views",
    security(("bearer_auth" = [])),
    params(ViewsQuery),
    responses(
        (status = 200, description = "Views saved by the caller", body = ListResponse<SavedViewInfo>),
        (status = 400, description = "Unknown page", body = ApiError)
    ),
    tag = "views"
)]
pub async fn list_views(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ViewsQuery>,
) -> Result<Json<ListResponse<SavedViewInfo>>, ApiError> {
    let views = views::list(&state.db, &auth, query.page.as_deref()).await?;
    Ok(Json(views.into_iter().collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/views",
    security(("bearer_auth" = [])),
    request_body = CreateViewRequest,
    responses(
        (status = 201, description = "View saved", body = SavedViewInfo),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Saved view limit reached", body = ApiError)
    ),
    tag = "views"
)]
pub async fn create_view(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<CreateViewRequest>,
) -> Result<(StatusCode, Json<SavedViewInfo>), ApiError> {
    let view = views::create(
        &state.db,
        &auth,
        NewView {
            name: request.name,
            page: request.page,
            filters: request.filters,
            is_default: request.is_default,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

#[utoipa::path(
    patch,
    path = "/api/v1/views/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "View id")),
    request_body = UpdateViewRequest,
    responses(
        (status = 200, description = "Updated view", body = SavedViewInfo),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "View not found", body = ApiError)
    ),
    tag = "views"
)]
pub async fn update_view(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateViewRequest>,
) -> Result<Json<SavedViewInfo>, ApiError> {
    let view = views::update(
        &state.db,
        &auth,
        id,
        request.name,
        request.filters,
        request.is_default,
    )
    .await?;
    Ok(Json(view.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/views/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "View id")),
    responses(
        (status = 204, description = "View deleted"),
        (status = 404, description = "View not found", body = ApiError)
    ),
    tag = "views"
)]
pub async fn delete_view(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    views::delete(&state.db, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

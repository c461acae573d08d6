//! # Integration Handlers
//!
//! OAuth connection lifecycle for ad and commerce platforms, plus the ad
//! accounts discovered through them. The OAuth callback is public and
//! authenticated by its one-time `state`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::types::{AdAccountInfo, ApiJson, ApiQuery, IntegrationInfo, ListResponse};
use crate::server::AppState;
use crate::services::IntegrationService;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectResponse {
    pub integration: IntegrationInfo,
    /// Provider consent page; null when no OAuth client is configured
    pub authorize_url: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    /// Authorization code issued by the provider
    pub code: String,
    /// State issued by the connect call
    pub state: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdAccountsQuery {
    /// Only ad accounts of this platform
    pub platform: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateAdAccountRequest {
    /// active or paused
    #[schema(example = "paused")]
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/integrations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Integrations of the account", body = ListResponse<IntegrationInfo>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn list_integrations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ListResponse<IntegrationInfo>>, ApiError> {
    let integrations = IntegrationService::new(&state).list(&auth).await?;
    Ok(Json(integrations.into_iter().collect()))
}

/// Start connecting a platform
#[utoipa::path(
    post,
    path = "/api/v1/integrations/{platform}/connect",
    security(("bearer_auth" = [])),
    params(("platform" = String, Path, description = "shopify, meta_ads, google_ads or tiktok_ads")),
    responses(
        (status = 200, description = "Pending integration and consent URL", body = ConnectResponse),
        (status = 400, description = "Unknown platform", body = ApiError),
        (status = 403, description = "Insufficient permissions or integration limit reached", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn connect_integration(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(platform): Path<String>,
) -> Result<Json<ConnectResponse>, ApiError> {
    let start = IntegrationService::new(&state)
        .connect(&auth, &platform)
        .await?;
    Ok(Json(ConnectResponse {
        integration: start.integration.into(),
        authorize_url: start.authorize_url,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/integrations/{platform}/callback",
    params(
        ("platform" = String, Path, description = "Platform slug"),
        CallbackQuery
    ),
    responses(
        (status = 200, description = "Integration connected", body = IntegrationInfo),
        (status = 400, description = "Unknown platform or invalid state", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    ApiQuery(query): ApiQuery<CallbackQuery>,
) -> Result<Json<IntegrationInfo>, ApiError> {
    let integration = IntegrationService::new(&state)
        .callback(&platform, &query.code, &query.state)
        .await?;
    Ok(Json(integration.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/integrations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Integration id")),
    responses(
        (status = 204, description = "Integration disconnected"),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Integration not found", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn disconnect_integration(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    IntegrationService::new(&state).disconnect(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/ad-accounts",
    security(("bearer_auth" = [])),
    params(AdAccountsQuery),
    responses(
        (status = 200, description = "Ad accounts of the account", body = ListResponse<AdAccountInfo>),
        (status = 400, description = "Unknown platform", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn list_ad_accounts(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<AdAccountsQuery>,
) -> Result<Json<ListResponse<AdAccountInfo>>, ApiError> {
    let ad_accounts = IntegrationService::new(&state)
        .ad_accounts(&auth, query.platform.as_deref())
        .await?;
    Ok(Json(ad_accounts.into_iter().collect()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/ad-accounts/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Ad account id")),
    request_body = UpdateAdAccountRequest,
    responses(
        (status = 200, description = "Updated ad account", body = AdAccountInfo),
        (status = 400, description = "Invalid status or disconnected ad account", body = ApiError),
        (status = 404, description = "Ad account not found", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn update_ad_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateAdAccountRequest>,
) -> Result<Json<AdAccountInfo>, ApiError> {
    let ad_account = IntegrationService::new(&state)
        .set_ad_account_status(&auth, id, request.status.trim())
        .await?;
    Ok(Json(ad_account.into()))
}

//! # Account Handlers

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::types::{AccountInfo, ApiJson};
use crate::server::AppState;
use crate::services::account;

/// Partial account profile update
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateAccountRequest {
    pub name: Option<String>,
    #[schema(example = "Europe/Berlin")]
    pub timezone: Option<String>,
    #[schema(example = "EUR")]
    pub currency: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/account",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account profile", body = AccountInfo),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "account"
)]
pub async fn get_account(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<AccountInfo>, ApiError> {
    Ok(Json(account::get(&state.db, &auth).await?.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/account",
    security(("bearer_auth" = [])),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Updated account profile", body = AccountInfo),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Role cannot manage the account", body = ApiError)
    ),
    tag = "account"
)]
pub async fn update_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<UpdateAccountRequest>,
) -> Result<Json<AccountInfo>, ApiError> {
    let account = account::update(
        &state.db,
        &auth,
        request.name,
        request.timezone,
        request.currency,
    )
    .await?;
    Ok(Json(account.into()))
}

//! # Authentication Handlers
//!
//! Signup and login issue bearer tokens; `/auth/me` echoes the caller.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers::types::{ApiJson, MeResponse, SessionResponse};
use crate::server::AppState;
use crate::services::auth::{self as auth_service, Session, SignupInput};

/// Signup request body
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SignupRequest {
    #[schema(example = "founder@acme.io")]
    pub email: String,
    /// 8 to 128 characters
    pub password: String,
    pub full_name: Option<String>,
    /// Defaults to the email domain
    pub account_name: Option<String>,
}

/// Login request body
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub(crate) fn session_response(config: &AppConfig, session: Session) -> SessionResponse {
    SessionResponse {
        token: session.token,
        token_type: "Bearer".to_string(),
        expires_in: config.jwt_ttl_seconds,
        user: session.user.into(),
        account: session.account.into(),
    }
}

/// Create an account and its owner
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = auth_service::signup(
        &state.config,
        &state.db,
        SignupInput {
            email: request.email,
            password: request.password,
            full_name: request.full_name,
            account_name: request.account_name,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(session_response(&state.config, session)),
    ))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session =
        auth_service::login(&state.config, &state.db, &request.email, &request.password).await?;
    Ok(Json(session_response(&state.config, session)))
}

/// Current user and account
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current principal", body = MeResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let (user, account) = auth_service::me(&state.db, &auth).await?;
    Ok(Json(MeResponse {
        user: user.into(),
        account: account.into(),
    }))
}

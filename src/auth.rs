//! # Authentication and Authorization
//!
//! Bearer JWT authentication for protected endpoints and the static
//! role/permission table used for authorization.

use std::fmt;
use std::str::FromStr;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, unauthorized};
use crate::models::user::Model as UserModel;
use crate::repositories::UserRepository;
use crate::server::AppState;

/// Role of a user within their account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Member,
    Viewer,
}

/// Actions gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewMetrics,
    EditReports,
    ManageIntegrations,
    ManageTeam,
    ManageAccount,
    ManageBilling,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Owner, Role::Admin, Role::Member, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Viewer => "viewer",
        }
    }

    /// Whether this role grants `permission`
    pub fn has(&self, permission: Permission) -> bool {
        use Permission::*;

        match self {
            Role::Owner => true,
            Role::Admin => !matches!(permission, ManageBilling),
            Role::Member => matches!(permission, ViewMetrics | EditReports | ManageIntegrations),
            Role::Viewer => matches!(permission, ViewMetrics),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| crate::error::bad_request("role must be one of owner, admin, member, viewer"))
    }
}

/// JWT claims issued at login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub account_id: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated principal inserted into request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub role: Role,
    pub email: String,
}

impl AuthUser {
    /// Fail with 403 unless the caller's role grants `permission`
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.role.has(permission) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.user_id,
                role = %self.role,
                ?permission,
                "Permission denied"
            );
            Err(forbidden(Some("Your role does not allow this action")))
        }
    }
}

/// Sign a token for `user` valid for the configured TTL
pub fn issue_token(config: &AppConfig, user: &UserModel) -> Result<String, ApiError> {
    let role: Role = user.role.parse()?;
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        account_id: user.account_id,
        role,
        iat: now,
        exp: now + config.jwt_ttl_seconds as i64,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("failed to sign token: {e}").into())
}

/// Verify signature and expiry of a token
pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        unauthorized(Some("Invalid or expired token"))
    })
}

/// Resolve a token to a live principal.
///
/// The user is reloaded on every call so deactivation and role changes take
/// effect before the token expires.
pub async fn authenticate(
    config: &AppConfig,
    db: &DatabaseConnection,
    token: &str,
) -> Result<AuthUser, ApiError> {
    let claims = decode_token(config, token)?;

    let user = UserRepository::new(db)
        .find_by_id(claims.sub)
        .await?
        .filter(|user| user.is_active && user.account_id == claims.account_id)
        .ok_or_else(|| unauthorized(Some("Invalid or expired token")))?;

    Ok(AuthUser {
        user_id: user.id,
        account_id: user.account_id,
        role: user.role.parse()?,
        email: user.email,
    })
}

/// Authentication middleware that validates bearer JWTs
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    let auth_user = authenticate(&state.config, &state.db, token).await?;

    tracing::debug!(
        user_id = %auth_user.user_id,
        account_id = %auth_user.account_id,
        "Authenticated request"
    );

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Authentication required")))
    }
}

//! # Team Handlers
//!
//! Member management and invitations. Accepting an invite is public; the
//! token in the body is the credential.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthUser, Role};
use crate::error::ApiError;
use crate::handlers::auth::session_response;
use crate::handlers::types::{
    ApiJson, CreatedInvite, InviteInfo, ListResponse, SessionResponse, UserInfo,
};
use crate::server::AppState;
use crate::services::TeamService;
use crate::services::team::AcceptInviteInput;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateMemberRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateInviteRequest {
    #[schema(example = "analyst@acme.io")]
    pub email: String,
    /// admin, member or viewer
    pub role: Role,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AcceptInviteRequest {
    pub token: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/team/members",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account members", body = ListResponse<UserInfo>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "team"
)]
pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ListResponse<UserInfo>>, ApiError> {
    let members = TeamService::new(&state).list_members(&auth).await?;
    Ok(Json(members.into_iter().collect()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/team/members/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Member user id")),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Updated member", body = UserInfo),
        (status = 400, description = "Own role or last owner", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Member not found", body = ApiError)
    ),
    tag = "team"
)]
pub async fn update_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateMemberRequest>,
) -> Result<Json<UserInfo>, ApiError> {
    let member = TeamService::new(&state)
        .change_role(&auth, id, request.role)
        .await?;
    Ok(Json(member.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/team/members/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Member user id")),
    responses(
        (status = 204, description = "Member removed"),
        (status = 400, description = "Self or last owner", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Member not found", body = ApiError)
    ),
    tag = "team"
)]
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    TeamService::new(&state).remove_member(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/team/invites",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Invites of the account", body = ListResponse<InviteInfo>),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "team"
)]
pub async fn list_invites(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ListResponse<InviteInfo>>, ApiError> {
    let invites = TeamService::new(&state).list_invites(&auth).await?;
    Ok(Json(invites.into_iter().collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/team/invites",
    security(("bearer_auth" = [])),
    request_body = CreateInviteRequest,
    responses(
        (status = 201, description = "Invite created", body = CreatedInvite),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Insufficient permissions or seat limit reached", body = ApiError),
        (status = 409, description = "User or pending invite already exists", body = ApiError)
    ),
    tag = "team"
)]
pub async fn create_invite(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<CreateInviteRequest>,
) -> Result<(StatusCode, Json<CreatedInvite>), ApiError> {
    let invite = TeamService::new(&state)
        .create_invite(&auth, &request.email, request.role)
        .await?;

    let accept_url = format!(
        "{}/invites/accept?token={}",
        state.config.frontend_url.trim_end_matches('/'),
        invite.token
    );
    let token = invite.token.clone();
    Ok((
        StatusCode::CREATED,
        Json(CreatedInvite {
            invite: invite.into(),
            token,
            accept_url,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/team/invites/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invite id")),
    responses(
        (status = 204, description = "Invite revoked"),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Invite not found", body = ApiError)
    ),
    tag = "team"
)]
pub async fn revoke_invite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    TeamService::new(&state).revoke_invite(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Redeem an invite token and sign in as the new member
#[utoipa::path(
    post,
    path = "/api/v1/team/invites/accept",
    request_body = AcceptInviteRequest,
    responses(
        (status = 201, description = "Member created", body = SessionResponse),
        (status = 400, description = "Invalid, used or expired invite", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "team"
)]
pub async fn accept_invite(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AcceptInviteRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = TeamService::new(&state)
        .accept_invite(AcceptInviteInput {
            token: request.token,
            password: request.password,
            full_name: request.full_name,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(session_response(&state.config, session)),
    ))
}

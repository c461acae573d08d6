//! Team membership and invitations.

use chrono::{Duration, Utc};
use sea_orm::TransactionTrait;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{AuthUser, Permission, Role, issue_token};
use crate::crypto::{generate_token, hash_password};
use crate::error::{ApiError, bad_request, conflict, forbidden};
use crate::models::account::Model as AccountModel;
use crate::models::team_invite::Model as TeamInviteModel;
use crate::models::user::Model as UserModel;
use crate::repositories::team_invite::CreateInviteRequest;
use crate::repositories::user::CreateUserRequest;
use crate::repositories::{AccountRepository, TeamInviteRepository, UserRepository};
use crate::server::AppState;
use crate::services::auth::Session;
use crate::services::billing::{Resource, check_limit};
use crate::services::events;
use crate::services::validation::{normalize_email, validate_name, validate_password};

/// Roles an invite may grant
pub const INVITABLE_ROLES: [Role; 3] = [Role::Admin, Role::Member, Role::Viewer];

#[derive(Debug, Clone, Default)]
pub struct AcceptInviteInput {
    pub token: String,
    pub password: String,
    pub full_name: Option<String>,
}

pub struct TeamService<'a> {
    state: &'a AppState,
}

impl<'a> TeamService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn list_members(&self, auth: &AuthUser) -> Result<Vec<UserModel>, ApiError> {
        Ok(UserRepository::new(&self.state.db)
            .list_by_account(auth.account_id)
            .await?)
    }

    pub async fn change_role(
        &self,
        auth: &AuthUser,
        member_id: Uuid,
        role: Role,
    ) -> Result<UserModel, ApiError> {
        auth.require(Permission::ManageTeam)?;
        if member_id == auth.user_id {
            return Err(bad_request("you cannot change your own role"));
        }
        if role == Role::Owner && auth.role != Role::Owner {
            return Err(forbidden(Some("only owners can grant the owner role")));
        }

        let users = UserRepository::new(&self.state.db);
        let member = users.get_in_account(auth.account_id, member_id).await?;
        if member.role == Role::Owner.as_str() {
            if auth.role != Role::Owner {
                return Err(forbidden(Some("only owners can change another owner's role")));
            }
            if role != Role::Owner && users.count_owners(auth.account_id).await? <= 1 {
                return Err(bad_request("an account must keep at least one owner"));
            }
        }

        let previous = member.role.clone();
        let member = users.update_role(member, role.as_str()).await?;
        tracing::info!(
            account_id = %auth.account_id,
            member_id = %member.id,
            from = %previous,
            to = %role,
            "Member role changed"
        );
        self.state.notifications.publish(
            auth.account_id,
            "team.role_changed",
            json!({ "user_id": member.id, "role": role }),
        );
        Ok(member)
    }

    pub async fn remove_member(&self, auth: &AuthUser, member_id: Uuid) -> Result<(), ApiError> {
        auth.require(Permission::ManageTeam)?;
        if member_id == auth.user_id {
            return Err(bad_request("you cannot remove yourself"));
        }

        let users = UserRepository::new(&self.state.db);
        let member = users.get_in_account(auth.account_id, member_id).await?;
        if member.role == Role::Owner.as_str() {
            if auth.role != Role::Owner {
                return Err(forbidden(Some("only owners can remove another owner")));
            }
            if users.count_owners(auth.account_id).await? <= 1 {
                return Err(bad_request("an account must keep at least one owner"));
            }
        }

        users.delete(member).await?;
        tracing::info!(account_id = %auth.account_id, %member_id, "Member removed");
        self.state.notifications.publish(
            auth.account_id,
            "team.member_removed",
            json!({ "user_id": member_id }),
        );
        Ok(())
    }

    pub async fn create_invite(
        &self,
        auth: &AuthUser,
        email: &str,
        role: Role,
    ) -> Result<TeamInviteModel, ApiError> {
        auth.require(Permission::ManageTeam)?;
        let email = normalize_email(email)?;
        if !INVITABLE_ROLES.contains(&role) {
            return Err(bad_request("role must be one of admin, member, viewer"));
        }

        let db = &self.state.db;
        let now = Utc::now();
        let invites = TeamInviteRepository::new(db);
        let users = UserRepository::new(db);

        let account = AccountRepository::new(db).get(auth.account_id).await?;
        let seats_used = users.count_active(account.id).await? + invites.count_pending(account.id, now).await?;
        check_limit(&account.plan, Resource::Users, seats_used)?;

        if users.find_by_email(&email).await?.is_some() {
            return Err(conflict("A user with this email already exists"));
        }
        if invites
            .find_pending_for_email(account.id, &email, now)
            .await?
            .is_some()
        {
            return Err(conflict("A pending invite for this email already exists"));
        }

        let invite = invites
            .create(CreateInviteRequest {
                account_id: account.id,
                email,
                role: role.as_str().to_string(),
                token: generate_token(),
                invited_by: auth.user_id,
                expires_at: now + Duration::hours(self.state.config.invite_ttl_hours as i64),
            })
            .await?;

        tracing::info!(account_id = %account.id, invite_id = %invite.id, role = %role, "Invite created");
        events::track(
            db,
            Some(account.id),
            Some(auth.user_id),
            "team.invite_created",
            json!({ "role": role }),
        )
        .await;
        self.state.notifications.publish(
            account.id,
            "team.invite_created",
            json!({ "invite_id": invite.id, "email": invite.email, "role": invite.role }),
        );
        Ok(invite)
    }

    pub async fn list_invites(&self, auth: &AuthUser) -> Result<Vec<TeamInviteModel>, ApiError> {
        auth.require(Permission::ManageTeam)?;
        let invites = TeamInviteRepository::new(&self.state.db);
        invites.expire_stale(auth.account_id, Utc::now()).await?;
        Ok(invites.list_by_account(auth.account_id).await?)
    }

    pub async fn revoke_invite(&self, auth: &AuthUser, invite_id: Uuid) -> Result<(), ApiError> {
        auth.require(Permission::ManageTeam)?;
        let invites = TeamInviteRepository::new(&self.state.db);
        let invite = invites.get_in_account(auth.account_id, invite_id).await?;
        invites.delete(invite).await?;
        Ok(())
    }

    /// Redeem an invite token, creating the invited user
    pub async fn accept_invite(&self, input: AcceptInviteInput) -> Result<Session, ApiError> {
        validate_password(&input.password)?;
        let full_name = match input.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => Some(validate_name(name, "full_name", 255)?),
            _ => None,
        };

        let db = &self.state.db;
        let invites = TeamInviteRepository::new(db);
        let invite = invites
            .find_by_token(input.token.trim())
            .await?
            .filter(|invite| invite.status == "pending")
            .ok_or_else(|| bad_request("invite is invalid or has already been used"))?;

        if invite.expires_at.with_timezone(&Utc) <= Utc::now() {
            invites.mark_expired(invite).await?;
            return Err(bad_request("invite has expired"));
        }

        if UserRepository::new(db)
            .find_by_email(&invite.email)
            .await?
            .is_some()
        {
            return Err(conflict("A user with this email already exists"));
        }

        let password_hash = hash_password(&input.password).map_err(anyhow::Error::from)?;
        let account_id = invite.account_id;

        let txn = db.begin().await?;
        let user = UserRepository::new(&txn)
            .create(CreateUserRequest {
                account_id,
                email: invite.email.clone(),
                password_hash,
                full_name,
                role: invite.role.clone(),
            })
            .await?;
        TeamInviteRepository::new(&txn)
            .mark_accepted(invite, Utc::now())
            .await?;
        txn.commit().await?;

        let account: AccountModel = AccountRepository::new(db).get(account_id).await?;
        tracing::info!(%account_id, user_id = %user.id, "Invite accepted");
        events::track(
            db,
            Some(account_id),
            Some(user.id),
            "team.invite_accepted",
            json!({ "role": user.role }),
        )
        .await;
        self.state.notifications.publish(
            account_id,
            "team.member_joined",
            json!({ "user_id": user.id, "email": user.email }),
        );

        let token = issue_token(&self.state.config, &user)?;
        Ok(Session {
            token,
            user,
            account,
        })
    }
}

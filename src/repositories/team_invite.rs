//! # Team Invite Repository

use crate::error::RepositoryError;
use crate::models::team_invite::{self, ActiveModel, Entity as TeamInvite, Model as TeamInviteModel};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, sea_query::Expr,
};
use uuid::Uuid;

/// Request data for creating a new invite
#[derive(Debug, Clone)]
pub struct CreateInviteRequest {
    pub account_id: Uuid,
    pub email: String,
    pub role: String,
    pub token: String,
    pub invited_by: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Repository for TeamInvite database operations
pub struct TeamInviteRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> TeamInviteRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        request: CreateInviteRequest,
    ) -> Result<TeamInviteModel, RepositoryError> {
        let invite = ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(request.account_id),
            email: Set(request.email),
            role: Set(request.role),
            token: Set(request.token),
            status: Set("pending".to_string()),
            invited_by: Set(request.invited_by),
            expires_at: Set(request.expires_at.into()),
            accepted_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        invite
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Flip pending invites past their expiry to `expired`
    pub async fn expire_stale(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = TeamInvite::update_many()
            .col_expr(team_invite::Column::Status, Expr::value("expired"))
            .filter(team_invite::Column::AccountId.eq(account_id))
            .filter(team_invite::Column::Status.eq("pending"))
            .filter(team_invite::Column::ExpiresAt.lte(now))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }

    pub async fn list_by_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<TeamInviteModel>, RepositoryError> {
        TeamInvite::find()
            .filter(team_invite::Column::AccountId.eq(account_id))
            .order_by_desc(team_invite::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_in_account(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<TeamInviteModel, RepositoryError> {
        TeamInvite::find_by_id(id)
            .filter(team_invite::Column::AccountId.eq(account_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Invite"))
    }

    pub async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<TeamInviteModel>, RepositoryError> {
        TeamInvite::find()
            .filter(team_invite::Column::Token.eq(token))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Unexpired pending invites, which hold a seat
    pub async fn count_pending(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        TeamInvite::find()
            .filter(team_invite::Column::AccountId.eq(account_id))
            .filter(team_invite::Column::Status.eq("pending"))
            .filter(team_invite::Column::ExpiresAt.gt(now))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_pending_for_email(
        &self,
        account_id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TeamInviteModel>, RepositoryError> {
        TeamInvite::find()
            .filter(team_invite::Column::AccountId.eq(account_id))
            .filter(team_invite::Column::Email.eq(email))
            .filter(team_invite::Column::Status.eq("pending"))
            .filter(team_invite::Column::ExpiresAt.gt(now))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn mark_expired(
        &self,
        invite: TeamInviteModel,
    ) -> Result<TeamInviteModel, RepositoryError> {
        let mut active = invite.into_active_model();
        active.status = Set("expired".to_string());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn mark_accepted(
        &self,
        invite: TeamInviteModel,
        at: DateTime<Utc>,
    ) -> Result<TeamInviteModel, RepositoryError> {
        let mut active = invite.into_active_model();
        active.status = Set("accepted".to_string());
        active.accepted_at = Set(Some(at.into()));
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, invite: TeamInviteModel) -> Result<(), RepositoryError> {
        invite
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

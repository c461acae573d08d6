//! # User Repository
//!
//! Persistence for users. Every lookup except email-based login is scoped to
//! an account.

use crate::error::RepositoryError;
use crate::models::user::{self, ActiveModel, Entity as User, Model as UserModel};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

/// Request data for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub account_id: Uuid,
    /// Already normalized (trimmed, lowercased)
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: String,
}

/// Repository for User database operations
pub struct UserRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, request: CreateUserRequest) -> Result<UserModel, RepositoryError> {
        let now = Utc::now();
        let user = ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(request.account_id),
            email: Set(request.email),
            password_hash: Set(request.password_hash),
            full_name: Set(request.full_name),
            role: Set(request.role),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        user.insert(self.db).await.map_err(|err| {
            if matches!(
                err.sql_err(),
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
            ) {
                RepositoryError::Conflict("A user with this email already exists".to_string())
            } else {
                RepositoryError::database_error(err)
            }
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, RepositoryError> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_in_account(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<UserModel, RepositoryError> {
        User::find_by_id(id)
            .filter(user::Column::AccountId.eq(account_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Member"))
    }

    pub async fn list_by_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<UserModel>, RepositoryError> {
        User::find()
            .filter(user::Column::AccountId.eq(account_id))
            .order_by_asc(user::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count_active(&self, account_id: Uuid) -> Result<u64, RepositoryError> {
        User::find()
            .filter(user::Column::AccountId.eq(account_id))
            .filter(user::Column::IsActive.eq(true))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count_owners(&self, account_id: Uuid) -> Result<u64, RepositoryError> {
        User::find()
            .filter(user::Column::AccountId.eq(account_id))
            .filter(user::Column::Role.eq("owner"))
            .filter(user::Column::IsActive.eq(true))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update_role(
        &self,
        user: UserModel,
        role: &str,
    ) -> Result<UserModel, RepositoryError> {
        let mut active = user.into_active_model();
        active.role = Set(role.to_string());
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn touch_last_login(&self, user: UserModel) -> Result<UserModel, RepositoryError> {
        let now = Utc::now();
        let mut active = user.into_active_model();
        active.last_login_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, user: UserModel) -> Result<(), RepositoryError> {
        user.delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

//! # Saved View Repository
//!
//! Views belong to a user inside an account; every query filters on both.

use crate::error::RepositoryError;
use crate::models::saved_view::{self, ActiveModel, Entity as SavedView, Model as SavedViewModel};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, sea_query::Expr,
};
use serde_json::Value;
use uuid::Uuid;

/// Request data for creating a new saved view
#[derive(Debug, Clone)]
pub struct CreateSavedViewRequest {
    pub account_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub page: String,
    pub filters: Value,
    pub is_default: bool,
}

/// Changes accepted by [`SavedViewRepository::update`]
#[derive(Debug, Clone, Default)]
pub struct SavedViewUpdate {
    pub name: Option<String>,
    pub filters: Option<Value>,
    pub is_default: Option<bool>,
}

/// Repository for SavedView database operations
pub struct SavedViewRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> SavedViewRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn list_for_user(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        page: Option<&str>,
    ) -> Result<Vec<SavedViewModel>, RepositoryError> {
        let mut query = SavedView::find()
            .filter(saved_view::Column::AccountId.eq(account_id))
            .filter(saved_view::Column::UserId.eq(user_id));
        if let Some(page) = page {
            query = query.filter(saved_view::Column::Page.eq(page));
        }

        query
            .order_by_asc(saved_view::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_for_user(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<SavedViewModel, RepositoryError> {
        SavedView::find_by_id(id)
            .filter(saved_view::Column::AccountId.eq(account_id))
            .filter(saved_view::Column::UserId.eq(user_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Saved view"))
    }

    pub async fn count_by_account(&self, account_id: Uuid) -> Result<u64, RepositoryError> {
        SavedView::find()
            .filter(saved_view::Column::AccountId.eq(account_id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Clear the default flag on the user's other views for `page`
    pub async fn clear_defaults(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        page: &str,
        except: Option<Uuid>,
    ) -> Result<u64, RepositoryError> {
        let mut update = SavedView::update_many()
            .col_expr(saved_view::Column::IsDefault, Expr::value(false))
            .filter(saved_view::Column::AccountId.eq(account_id))
            .filter(saved_view::Column::UserId.eq(user_id))
            .filter(saved_view::Column::Page.eq(page))
            .filter(saved_view::Column::IsDefault.eq(true));
        if let Some(except) = except {
            update = update.filter(saved_view::Column::Id.ne(except));
        }

        let result = update
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(result.rows_affected)
    }

    pub async fn create(
        &self,
        request: CreateSavedViewRequest,
    ) -> Result<SavedViewModel, RepositoryError> {
        let now = Utc::now();
        let view = ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(request.account_id),
            user_id: Set(request.user_id),
            name: Set(request.name),
            page: Set(request.page),
            filters: Set(request.filters),
            is_default: Set(request.is_default),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        view.insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        view: SavedViewModel,
        update: SavedViewUpdate,
    ) -> Result<SavedViewModel, RepositoryError> {
        let mut active = view.into_active_model();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(filters) = update.filters {
            active.filters = Set(filters);
        }
        if let Some(is_default) = update.is_default {
            active.is_default = Set(is_default);
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, view: SavedViewModel) -> Result<(), RepositoryError> {
        view.delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

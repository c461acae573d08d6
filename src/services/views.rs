//! Saved dashboard views. Views are private to the user who saved them.

use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, bad_request};
use crate::models::saved_view::Model as SavedViewModel;
use crate::repositories::saved_view::{CreateSavedViewRequest, SavedViewUpdate};
use crate::repositories::{AccountRepository, SavedViewRepository};
use crate::services::billing::{Resource, check_limit};
use crate::services::validation::validate_name;
use sea_orm::{DatabaseConnection, TransactionTrait};

pub const VIEW_PAGES: [&str; 4] = ["dashboard", "campaigns", "orders", "reports"];
pub const MAX_VIEW_NAME_LEN: usize = 100;

fn validate_page(page: &str) -> Result<(), ApiError> {
    if VIEW_PAGES.contains(&page) {
        Ok(())
    } else {
        Err(bad_request(
            "page must be one of dashboard, campaigns, orders, reports",
        ))
    }
}

fn validate_filters(filters: &Value) -> Result<(), ApiError> {
    if filters.is_object() {
        Ok(())
    } else {
        Err(bad_request("filters must be a JSON object"))
    }
}

#[derive(Debug, Clone)]
pub struct NewView {
    pub name: String,
    pub page: String,
    pub filters: Option<Value>,
    pub is_default: bool,
}

pub async fn list(
    db: &DatabaseConnection,
    auth: &AuthUser,
    page: Option<&str>,
) -> Result<Vec<SavedViewModel>, ApiError> {
    if let Some(page) = page {
        validate_page(page)?;
    }
    Ok(SavedViewRepository::new(db)
        .list_for_user(auth.account_id, auth.user_id, page)
        .await?)
}

pub async fn create(
    db: &DatabaseConnection,
    auth: &AuthUser,
    input: NewView,
) -> Result<SavedViewModel, ApiError> {
    let name = validate_name(&input.name, "name", MAX_VIEW_NAME_LEN)?;
    validate_page(&input.page)?;
    let filters = input.filters.unwrap_or_else(|| Value::Object(Default::default()));
    validate_filters(&filters)?;

    let views = SavedViewRepository::new(db);
    let account = AccountRepository::new(db).get(auth.account_id).await?;
    check_limit(
        &account.plan,
        Resource::SavedViews,
        views.count_by_account(account.id).await?,
    )?;

    let txn = db.begin().await?;
    let views = SavedViewRepository::new(&txn);
    if input.is_default {
        views
            .clear_defaults(auth.account_id, auth.user_id, &input.page, None)
            .await?;
    }

    let view = views
        .create(CreateSavedViewRequest {
            account_id: auth.account_id,
            user_id: auth.user_id,
            name,
            page: input.page,
            filters,
            is_default: input.is_default,
        })
        .await?;
    txn.commit().await?;
    tracing::debug!(view_id = %view.id, page = %view.page, "Saved view created");
    Ok(view)
}

pub async fn update(
    db: &DatabaseConnection,
    auth: &AuthUser,
    id: Uuid,
    name: Option<String>,
    filters: Option<Value>,
    is_default: Option<bool>,
) -> Result<SavedViewModel, ApiError> {
    let name = name
        .map(|name| validate_name(&name, "name", MAX_VIEW_NAME_LEN))
        .transpose()?;
    if let Some(filters) = &filters {
        validate_filters(filters)?;
    }

    let views = SavedViewRepository::new(db);
    let view = views
        .get_for_user(auth.account_id, auth.user_id, id)
        .await?;

    let txn = db.begin().await?;
    let views = SavedViewRepository::new(&txn);
    if is_default == Some(true) {
        views
            .clear_defaults(auth.account_id, auth.user_id, &view.page, Some(view.id))
            .await?;
    }

    let view = views
        .update(
            view,
            SavedViewUpdate {
                name,
                filters,
                is_default,
            },
        )
        .await?;
    txn.commit().await?;
    Ok(view)
}

pub async fn delete(db: &DatabaseConnection, auth: &AuthUser, id: Uuid) -> Result<(), ApiError> {
    let views = SavedViewRepository::new(db);
    let view = views
        .get_for_user(auth.account_id, auth.user_id, id)
        .await?;
    views.delete(view).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pages_are_restricted() {
        for page in VIEW_PAGES {
            assert!(validate_page(page).is_ok());
        }
        assert!(validate_page("settings").is_err());
    }

    #[test]
    fn filters_must_be_objects() {
        assert!(validate_filters(&json!({ "platform": "meta_ads" })).is_ok());
        assert!(validate_filters(&json!(["meta_ads"])).is_err());
    }
}

//! Account profile management.

use sea_orm::DatabaseConnection;

use crate::auth::{AuthUser, Permission};
use crate::error::{ApiError, bad_request};
use crate::models::account::Model as AccountModel;
use crate::repositories::AccountRepository;
use crate::repositories::account::AccountProfileUpdate;
use crate::services::validation::{validate_currency, validate_name};

pub async fn get(db: &DatabaseConnection, auth: &AuthUser) -> Result<AccountModel, ApiError> {
    Ok(AccountRepository::new(db).get(auth.account_id).await?)
}

pub async fn update(
    db: &DatabaseConnection,
    auth: &AuthUser,
    name: Option<String>,
    timezone: Option<String>,
    currency: Option<String>,
) -> Result<AccountModel, ApiError> {
    auth.require(Permission::ManageAccount)?;

    let mut update = AccountProfileUpdate::default();
    if let Some(name) = name {
        update.name = Some(validate_name(&name, "name", 255)?);
    }
    if let Some(timezone) = timezone {
        let timezone = timezone.trim();
        if timezone.is_empty() || timezone.len() > 64 {
            return Err(bad_request("timezone must be a non-empty IANA timezone name"));
        }
        update.timezone = Some(timezone.to_string());
    }
    if let Some(currency) = currency {
        update.currency = Some(validate_currency(&currency)?);
    }

    let account = AccountRepository::new(db)
        .update_profile(auth.account_id, update)
        .await?;
    tracing::info!(account_id = %account.id, "Account profile updated");
    Ok(account)
}

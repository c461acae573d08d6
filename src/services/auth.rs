//! Signup, login and the current principal.

use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::json;

use crate::auth::{AuthUser, Role, issue_token};
use crate::config::AppConfig;
use crate::crypto::{hash_password, verify_password};
use crate::error::{ApiError, conflict, unauthorized};
use crate::models::account::Model as AccountModel;
use crate::models::user::Model as UserModel;
use crate::repositories::user::CreateUserRequest;
use crate::repositories::{AccountRepository, UserRepository};
use crate::services::events;
use crate::services::validation::{normalize_email, validate_name, validate_password};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Token plus the principal it was issued for
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: UserModel,
    pub account: AccountModel,
}

#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub account_name: Option<String>,
}

fn default_account_name(email: &str) -> String {
    email
        .split_once('@')
        .map(|(_, domain)| domain.to_string())
        .unwrap_or_else(|| email.to_string())
}

/// Create an account with its owner in one transaction
pub async fn signup(
    config: &AppConfig,
    db: &DatabaseConnection,
    input: SignupInput,
) -> Result<Session, ApiError> {
    let email = normalize_email(&input.email)?;
    validate_password(&input.password)?;
    let account_name = match input.account_name.as_deref() {
        Some(name) if !name.trim().is_empty() => validate_name(name, "account_name", 255)?,
        _ => default_account_name(&email),
    };
    let full_name = match input.full_name.as_deref() {
        Some(name) if !name.trim().is_empty() => Some(validate_name(name, "full_name", 255)?),
        _ => None,
    };

    if UserRepository::new(db).find_by_email(&email).await?.is_some() {
        return Err(conflict("A user with this email already exists"));
    }

    let password_hash = hash_password(&input.password).map_err(anyhow::Error::from)?;

    let txn = db.begin().await?;
    let account = AccountRepository::new(&txn).create(&account_name).await?;
    let user = UserRepository::new(&txn)
        .create(CreateUserRequest {
            account_id: account.id,
            email,
            password_hash,
            full_name,
            role: Role::Owner.as_str().to_string(),
        })
        .await?;
    txn.commit().await?;

    tracing::info!(account_id = %account.id, user_id = %user.id, "New account signed up");
    events::track(
        db,
        Some(account.id),
        Some(user.id),
        "user.signed_up",
        json!({ "plan": account.plan }),
    )
    .await;

    let token = issue_token(config, &user)?;
    Ok(Session {
        token,
        user,
        account,
    })
}

pub async fn login(
    config: &AppConfig,
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<Session, ApiError> {
    let email = email.trim().to_lowercase();
    let users = UserRepository::new(db);

    let Some(user) = users.find_by_email(&email).await? else {
        return Err(unauthorized(Some(INVALID_CREDENTIALS)));
    };

    let password_ok = verify_password(password, &user.password_hash).unwrap_or_else(|error| {
        tracing::error!(user_id = %user.id, %error, "Stored password hash is unreadable");
        false
    });
    if !password_ok || !user.is_active {
        return Err(unauthorized(Some(INVALID_CREDENTIALS)));
    }

    let user = users.touch_last_login(user).await?;
    let account = AccountRepository::new(db).get(user.account_id).await?;

    events::track(
        db,
        Some(account.id),
        Some(user.id),
        "user.logged_in",
        json!({}),
    )
    .await;

    let token = issue_token(config, &user)?;
    Ok(Session {
        token,
        user,
        account,
    })
}

pub async fn me(
    db: &DatabaseConnection,
    auth: &AuthUser,
) -> Result<(UserModel, AccountModel), ApiError> {
    let user = UserRepository::new(db)
        .get_in_account(auth.account_id, auth.user_id)
        .await?;
    let account = AccountRepository::new(db).get(auth.account_id).await?;
    Ok((user, account))
}

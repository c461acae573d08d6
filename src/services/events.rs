//! Product analytics event log.

use regex::Regex;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::auth::{AuthUser, Permission};
use crate::error::{ApiError, bad_request};
use crate::models::product_event::Model as ProductEventModel;
use crate::repositories::ProductEventRepository;

static EVENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_.]{1,100}$").expect("valid event name pattern"));

pub const DEFAULT_LIST_LIMIT: u64 = 50;
pub const MAX_LIST_LIMIT: u64 = 500;

/// Record an internal event. Failures are logged and swallowed so tracking
/// never fails the operation that emitted it.
pub async fn track(
    db: &DatabaseConnection,
    account_id: Option<Uuid>,
    user_id: Option<Uuid>,
    event_name: &str,
    properties: Value,
) {
    if let Err(error) = ProductEventRepository::new(db)
        .insert(account_id, user_id, event_name, properties)
        .await
    {
        tracing::warn!(%error, event_name, "Failed to record product event");
    }
}

pub fn validate_event_name(name: &str) -> Result<(), ApiError> {
    if EVENT_NAME.is_match(name) {
        Ok(())
    } else {
        Err(bad_request(
            "event name must be 1-100 characters of lowercase letters, digits, '_' or '.'",
        ))
    }
}

/// Client-submitted event attributed to the caller
pub async fn track_from_client(
    db: &DatabaseConnection,
    auth: &AuthUser,
    event_name: &str,
    properties: Option<Value>,
) -> Result<ProductEventModel, ApiError> {
    validate_event_name(event_name)?;

    let properties = match properties {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(Value::Object(map)) => Value::Object(map),
        Some(_) => return Err(bad_request("properties must be a JSON object")),
    };

    Ok(ProductEventRepository::new(db)
        .insert(
            Some(auth.account_id),
            Some(auth.user_id),
            event_name,
            properties,
        )
        .await?)
}

pub async fn list_recent(
    db: &DatabaseConnection,
    auth: &AuthUser,
    limit: Option<u64>,
) -> Result<Vec<ProductEventModel>, ApiError> {
    auth.require(Permission::ManageAccount)?;

    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(bad_request("limit must be between 1 and 500"));
    }

    Ok(ProductEventRepository::new(db)
        .list_recent(auth.account_id, limit)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_name_rules() {
        for ok in ["user.signed_up", "report_run", "a", "v2.export.csv"] {
            assert!(validate_event_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", "User.SignedUp", "has space", "dash-name", &"a".repeat(101)] {
            assert!(validate_event_name(bad).is_err(), "{bad}");
        }
    }
}

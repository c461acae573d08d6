//! # Common API Types
//!
//! Response DTOs shared across handlers, the pagination wrapper and the JSON
//! and query extractors that render rejections as [`ApiError`].

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    account, ad_account, custom_metric, custom_report, integration, order, order_item,
    product_event, report_template, saved_view, scheduled_report, subscription, team_invite, user,
};

/// JSON body extractor whose rejection is an [`ApiError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string extractor whose rejection is an [`ApiError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

fn utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Generic paginated response wrapper for list endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    /// List of items for the current page
    pub data: Vec<T>,
    /// Opaque cursor for fetching the next page (null if this is the last page)
    pub next_cursor: Option<String>,
    /// Convenience field indicating if more pages exist
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, next_cursor: Option<String>) -> Self {
        let has_more = next_cursor.is_some();
        Self {
            data,
            next_cursor,
            has_more,
        }
    }
}

/// Wrapper for plain list responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T, M> FromIterator<M> for ListResponse<T>
where
    T: From<M>,
{
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(T::from).collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub account_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    #[schema(example = "owner")]
    pub role: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserInfo {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            is_active: model.is_active,
            last_login_at: model.last_login_at.map(utc),
            created_at: utc(model.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountInfo {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "free")]
    pub plan: String,
    pub timezone: String,
    #[schema(example = "USD")]
    pub currency: String,
    pub has_billing_customer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<account::Model> for AccountInfo {
    fn from(model: account::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            plan: model.plan,
            timezone: model.timezone,
            currency: model.currency,
            has_billing_customer: model.stripe_customer_id.is_some(),
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

/// Issued on signup, login and invite acceptance
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub user: UserInfo,
    pub account: AccountInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user: UserInfo,
    pub account: AccountInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InviteInfo {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    #[schema(example = "pending")]
    pub status: String,
    pub invited_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<team_invite::Model> for InviteInfo {
    fn from(model: team_invite::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            role: model.role,
            status: model.status,
            invited_by: model.invited_by,
            expires_at: utc(model.expires_at),
            accepted_at: model.accepted_at.map(utc),
            created_at: utc(model.created_at),
        }
    }
}

/// Newly created invite, including the token to share with the invitee
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedInvite {
    #[serde(flatten)]
    pub invite: InviteInfo,
    pub token: String,
    pub accept_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IntegrationInfo {
    pub id: Uuid,
    #[schema(example = "shopify")]
    pub platform: String,
    #[schema(example = "connected")]
    pub status: String,
    pub external_account_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    pub connected_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<integration::Model> for IntegrationInfo {
    fn from(model: integration::Model) -> Self {
        Self {
            id: model.id,
            platform: model.platform,
            status: model.status,
            external_account_id: model.external_account_id,
            metadata: model.metadata,
            connected_at: model.connected_at.map(utc),
            last_synced_at: model.last_synced_at.map(utc),
            created_at: utc(model.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdAccountInfo {
    pub id: Uuid,
    pub integration_id: Uuid,
    pub platform: String,
    pub external_id: String,
    pub name: String,
    pub currency: String,
    #[schema(example = "active")]
    pub status: String,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl From<ad_account::Model> for AdAccountInfo {
    fn from(model: ad_account::Model) -> Self {
        Self {
            id: model.id,
            integration_id: model.integration_id,
            platform: model.platform,
            external_id: model.external_id,
            name: model.name,
            currency: model.currency,
            status: model.status,
            last_synced_at: model.last_synced_at.map(utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionInfo {
    pub id: Uuid,
    pub stripe_subscription_id: String,
    pub plan: String,
    #[schema(example = "active")]
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<subscription::Model> for SubscriptionInfo {
    fn from(model: subscription::Model) -> Self {
        Self {
            id: model.id,
            stripe_subscription_id: model.stripe_subscription_id,
            plan: model.plan,
            status: model.status,
            current_period_start: model.current_period_start.map(utc),
            current_period_end: model.current_period_end.map(utc),
            cancel_at_period_end: model.cancel_at_period_end,
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemInfo {
    pub id: Uuid,
    pub product_id: Option<String>,
    pub sku: Option<String>,
    pub title: String,
    pub quantity: i32,
    pub price: f64,
}

impl From<order_item::Model> for OrderItemInfo {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            sku: model.sku,
            title: model.title,
            quantity: model.quantity,
            price: model.price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderInfo {
    pub id: Uuid,
    pub external_id: String,
    pub order_number: Option<String>,
    pub customer_email: Option<String>,
    pub total_price: f64,
    pub subtotal_price: f64,
    pub total_tax: f64,
    pub total_discounts: f64,
    pub currency: String,
    pub financial_status: String,
    pub source: Option<String>,
    pub utm_campaign: Option<String>,
    pub is_new_customer: bool,
    pub ordered_at: DateTime<Utc>,
    pub items: Vec<OrderItemInfo>,
}

impl From<(order::Model, Vec<order_item::Model>)> for OrderInfo {
    fn from((model, items): (order::Model, Vec<order_item::Model>)) -> Self {
        Self {
            id: model.id,
            external_id: model.external_id,
            order_number: model.order_number,
            customer_email: model.customer_email,
            total_price: model.total_price,
            subtotal_price: model.subtotal_price,
            total_tax: model.total_tax,
            total_discounts: model.total_discounts,
            currency: model.currency,
            financial_status: model.financial_status,
            source: model.source,
            utm_campaign: model.utm_campaign,
            is_new_customer: model.is_new_customer,
            ordered_at: utc(model.ordered_at),
            items: items.into_iter().map(OrderItemInfo::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SavedViewInfo {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "dashboard")]
    pub page: String,
    #[schema(value_type = Object)]
    pub filters: Value,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<saved_view::Model> for SavedViewInfo {
    fn from(model: saved_view::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            page: model.page,
            filters: model.filters,
            is_default: model.is_default,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduledReportInfo {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "summary")]
    pub report_type: String,
    #[schema(example = "weekly")]
    pub frequency: String,
    pub recipients: Vec<String>,
    pub is_active: bool,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub next_run_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<scheduled_report::Model> for ScheduledReportInfo {
    fn from(model: scheduled_report::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            report_type: model.report_type,
            frequency: model.frequency,
            recipients: string_list(model.recipients),
            is_active: model.is_active,
            last_sent_at: model.last_sent_at.map(utc),
            next_run_at: utc(model.next_run_at),
            created_by: model.created_by,
            created_at: utc(model.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomReportInfo {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    #[schema(value_type = Object)]
    pub filters: Value,
    #[schema(example = "last_30_days")]
    pub date_range: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<custom_report::Model> for CustomReportInfo {
    fn from(model: custom_report::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            metrics: string_list(model.metrics),
            dimensions: string_list(model.dimensions),
            filters: model.filters,
            date_range: model.date_range,
            created_by: model.created_by,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportTemplateInfo {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    #[schema(value_type = Object)]
    pub config: Value,
    pub is_system: bool,
}

impl From<report_template::Model> for ReportTemplateInfo {
    fn from(model: report_template::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            category: model.category,
            config: model.config,
            is_system: model.is_system,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomMetricInfo {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "profit")]
    pub key: String,
    #[schema(example = "revenue - ad_spend")]
    pub formula: String,
    #[schema(example = "currency")]
    pub format: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<custom_metric::Model> for CustomMetricInfo {
    fn from(model: custom_metric::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            key: model.key,
            formula: model.formula,
            format: model.format,
            description: model.description,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductEventInfo {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    #[schema(example = "report.exported")]
    pub event_name: String,
    #[schema(value_type = Object)]
    pub properties: Value,
    pub created_at: DateTime<Utc>,
}

impl From<product_event::Model> for ProductEventInfo {
    fn from(model: product_event::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            event_name: model.event_name,
            properties: model.properties,
            created_at: utc(model.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paginated_response_reports_more_pages() {
        let page = PaginatedResponse::new(vec![1, 2], Some("cursor".to_string()));
        assert!(page.has_more);
        assert!(!PaginatedResponse::<u8>::new(vec![], None).has_more);
    }

    #[test]
    fn string_lists_skip_non_strings() {
        assert_eq!(
            string_list(json!(["revenue", 3, "roas"])),
            vec!["revenue".to_string(), "roas".to_string()]
        );
        assert!(string_list(json!({"not": "a list"})).is_empty());
    }
}

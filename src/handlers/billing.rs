//! # Billing Handlers
//!
//! Plans, subscription status, Stripe checkout/portal sessions and the
//! Stripe webhook receiver. The webhook is authenticated by its signature.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::types::{ApiJson, ListResponse, SubscriptionInfo};
use crate::server::AppState;
use crate::services::BillingService;
use crate::services::billing::{FREE_PLAN, PLANS, PlanLimits, WebhookOutcome, limits_for};
use crate::webhook_verification::STRIPE_SIGNATURE_HEADER;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlanInfo {
    #[schema(example = "growth")]
    pub name: String,
    pub limits: PlanLimits,
    /// Whether a checkout can be started for this plan
    pub purchasable: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    /// Plan currently applied to the account
    pub plan: String,
    pub limits: PlanLimits,
    pub subscription: Option<SubscriptionInfo>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CheckoutRequest {
    #[schema(example = "starter")]
    pub plan: String,
}

/// Hosted Stripe page to redirect the browser to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HostedSessionResponse {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    #[schema(example = "processed")]
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/plans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Available plans", body = ListResponse<PlanInfo>)
    ),
    tag = "billing"
)]
pub async fn list_plans(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Json<ListResponse<PlanInfo>> {
    let plans = PLANS
        .iter()
        .map(|plan| PlanInfo {
            name: plan.name.to_string(),
            limits: plan.limits,
            purchasable: plan.name != FREE_PLAN
                && state.config.stripe.price_for_plan(plan.name).is_some(),
        })
        .collect();
    Json(ListResponse::new(plans))
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/subscription",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current plan and subscription", body = SubscriptionResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "billing"
)]
pub async fn get_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let (account, subscription) = BillingService::new(&state).subscription(&auth).await?;
    Ok(Json(SubscriptionResponse {
        limits: limits_for(&account.plan),
        plan: account.plan,
        subscription: subscription.map(SubscriptionInfo::from),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/billing/checkout",
    security(("bearer_auth" = [])),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checkout session created", body = HostedSessionResponse),
        (status = 400, description = "Plan not purchasable", body = ApiError),
        (status = 403, description = "Only owners manage billing", body = ApiError),
        (status = 502, description = "Stripe error", body = ApiError),
        (status = 503, description = "Stripe not configured", body = ApiError)
    ),
    tag = "billing"
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<Json<HostedSessionResponse>, ApiError> {
    let session = BillingService::new(&state)
        .create_checkout(&auth, request.plan.trim())
        .await?;
    Ok(Json(HostedSessionResponse {
        id: session.id,
        url: session.url,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/billing/portal",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Billing portal session created", body = HostedSessionResponse),
        (status = 400, description = "No billing customer yet", body = ApiError),
        (status = 403, description = "Only owners manage billing", body = ApiError)
    ),
    tag = "billing"
)]
pub async fn create_portal(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<HostedSessionResponse>, ApiError> {
    let session = BillingService::new(&state).create_portal(&auth).await?;
    Ok(Json(HostedSessionResponse {
        id: session.id,
        url: session.url,
    }))
}

/// Stripe webhook receiver
#[utoipa::path(
    post,
    path = "/api/v1/billing/webhook",
    params(
        ("Stripe-Signature" = String, Header, description = "Stripe signature header")
    ),
    request_body(content = String, description = "Raw Stripe event payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Invalid signature or payload", body = ApiError),
        (status = 503, description = "Webhook secret not configured", body = ApiError)
    ),
    tag = "billing"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAck>), ApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let outcome = BillingService::new(&state)
        .handle_webhook(&body, signature)
        .await?;

    let status = match outcome {
        WebhookOutcome::Processed => "processed",
        WebhookOutcome::Ignored(_) => "ignored",
    };
    Ok((
        StatusCode::OK,
        Json(WebhookAck {
            received: true,
            status: status.to_string(),
        }),
    ))
}

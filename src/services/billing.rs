//! Plans, plan limits, Stripe checkout and webhook processing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthUser, Permission};
use crate::error::{ApiError, bad_request, plan_limit_reached};
use crate::models::account::Model as AccountModel;
use crate::models::subscription::Model as SubscriptionModel;
use crate::repositories::subscription::SubscriptionUpsert;
use crate::repositories::{AccountRepository, SubscriptionRepository};
use crate::server::AppState;
use crate::services::events;
use crate::services::stripe::{CheckoutParams, HostedSession};
use crate::webhook_verification::verify_stripe_signature;

/// Usage limits of a plan; `None` means unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlanLimits {
    pub users: Option<u32>,
    pub integrations: Option<u32>,
    pub saved_views: Option<u32>,
    pub scheduled_reports: Option<u32>,
    pub custom_reports: Option<u32>,
    pub custom_metrics: Option<u32>,
}

/// A resource counted against plan limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Users,
    Integrations,
    SavedViews,
    ScheduledReports,
    CustomReports,
    CustomMetrics,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Integrations => "integrations",
            Resource::SavedViews => "saved_views",
            Resource::ScheduledReports => "scheduled_reports",
            Resource::CustomReports => "custom_reports",
            Resource::CustomMetrics => "custom_metrics",
        }
    }
}

impl PlanLimits {
    pub fn limit_for(&self, resource: Resource) -> Option<u32> {
        match resource {
            Resource::Users => self.users,
            Resource::Integrations => self.integrations,
            Resource::SavedViews => self.saved_views,
            Resource::ScheduledReports => self.scheduled_reports,
            Resource::CustomReports => self.custom_reports,
            Resource::CustomMetrics => self.custom_metrics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub name: &'static str,
    pub limits: PlanLimits,
}

pub const FREE_PLAN: &str = "free";

pub const PLANS: [Plan; 4] = [
    Plan {
        name: "free",
        limits: PlanLimits {
            users: Some(1),
            integrations: Some(1),
            saved_views: Some(3),
            scheduled_reports: Some(0),
            custom_reports: Some(1),
            custom_metrics: Some(0),
        },
    },
    Plan {
        name: "starter",
        limits: PlanLimits {
            users: Some(3),
            integrations: Some(3),
            saved_views: Some(10),
            scheduled_reports: Some(3),
            custom_reports: Some(5),
            custom_metrics: Some(5),
        },
    },
    Plan {
        name: "growth",
        limits: PlanLimits {
            users: Some(10),
            integrations: Some(10),
            saved_views: Some(50),
            scheduled_reports: Some(20),
            custom_reports: Some(25),
            custom_metrics: Some(25),
        },
    },
    Plan {
        name: "enterprise",
        limits: PlanLimits {
            users: None,
            integrations: None,
            saved_views: None,
            scheduled_reports: None,
            custom_reports: None,
            custom_metrics: None,
        },
    },
];

pub fn find_plan(name: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|plan| plan.name == name)
}

/// Limits of `plan`, treating unknown plans as free
pub fn limits_for(plan: &str) -> PlanLimits {
    find_plan(plan).unwrap_or(&PLANS[0]).limits
}

/// Allow creating one more `resource` when `current` already exist
pub fn check_limit(plan: &str, resource: Resource, current: u64) -> Result<(), ApiError> {
    match limits_for(plan).limit_for(resource) {
        Some(limit) if current >= u64::from(limit) => {
            tracing::info!(plan, resource = resource.as_str(), limit, current, "Plan limit reached");
            Err(plan_limit_reached(plan, resource.as_str(), limit))
        }
        _ => Ok(()),
    }
}

/// Outcome of processing one webhook event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed,
    Ignored(String),
}

pub struct BillingService<'a> {
    state: &'a AppState,
}

impl<'a> BillingService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn subscription(
        &self,
        auth: &AuthUser,
    ) -> Result<(AccountModel, Option<SubscriptionModel>), ApiError> {
        let account = AccountRepository::new(&self.state.db)
            .get(auth.account_id)
            .await?;
        let subscription = SubscriptionRepository::new(&self.state.db)
            .latest_for_account(auth.account_id)
            .await?;
        Ok((account, subscription))
    }

    pub async fn create_checkout(
        &self,
        auth: &AuthUser,
        plan: &str,
    ) -> Result<HostedSession, ApiError> {
        auth.require(Permission::ManageBilling)?;

        if plan == FREE_PLAN || find_plan(plan).is_none() {
            return Err(bad_request(
                "plan must be one of starter, growth, enterprise",
            ));
        }
        let price_id = self
            .state
            .config
            .stripe
            .price_for_plan(plan)
            .ok_or_else(|| bad_request("plan is not available for purchase"))?
            .to_string();

        let accounts = AccountRepository::new(&self.state.db);
        let account = accounts.get(auth.account_id).await?;

        let customer_id = match account.stripe_customer_id.clone() {
            Some(customer_id) => customer_id,
            None => {
                let customer_id = self
                    .state
                    .billing
                    .create_customer(&auth.email, &account.name, account.id)
                    .await?;
                accounts
                    .set_stripe_ids(account.id, Some(&customer_id), None)
                    .await?;
                tracing::info!(account_id = %account.id, %customer_id, "Created Stripe customer");
                customer_id
            }
        };

        let frontend = self.state.config.frontend_url.trim_end_matches('/');
        let session = self
            .state
            .billing
            .create_checkout_session(CheckoutParams {
                customer_id,
                price_id,
                account_id: account.id,
                plan: plan.to_string(),
                success_url: format!("{frontend}/settings/billing?checkout=success"),
                cancel_url: format!("{frontend}/settings/billing?checkout=cancelled"),
            })
            .await?;

        events::track(
            &self.state.db,
            Some(auth.account_id),
            Some(auth.user_id),
            "billing.checkout_started",
            json!({ "plan": plan }),
        )
        .await;

        Ok(session)
    }

    pub async fn create_portal(&self, auth: &AuthUser) -> Result<HostedSession, ApiError> {
        auth.require(Permission::ManageBilling)?;

        let account = AccountRepository::new(&self.state.db)
            .get(auth.account_id)
            .await?;
        let customer_id = account
            .stripe_customer_id
            .ok_or_else(|| bad_request("account has no billing customer yet"))?;

        let return_url = format!(
            "{}/settings/billing",
            self.state.config.frontend_url.trim_end_matches('/')
        );
        self.state
            .billing
            .create_portal_session(&customer_id, &return_url)
            .await
    }

    /// Verify and apply a Stripe webhook delivery
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookOutcome, ApiError> {
        let secret = self
            .state
            .config
            .stripe
            .webhook_secret
            .as_deref()
            .unwrap_or_default();
        verify_stripe_signature(
            payload,
            signature,
            secret,
            self.state.config.stripe.webhook_tolerance_seconds,
            Utc::now().timestamp(),
        )?;

        let event: Value = serde_json::from_slice(payload)
            .map_err(|_| bad_request("webhook payload must be a JSON object"))?;
        let event_type = event["type"].as_str().unwrap_or_default().to_string();
        let object = &event["data"]["object"];

        tracing::info!(
            event_id = event["id"].as_str().unwrap_or_default(),
            event_type,
            "Processing Stripe webhook"
        );
        metrics::counter!("stripe_webhooks_total", "type" => event_type.clone()).increment(1);

        let outcome = match event_type.as_str() {
            "checkout.session.completed" => self.on_checkout_completed(object).await?,
            "customer.subscription.created" | "customer.subscription.updated" => {
                self.on_subscription_changed(object).await?
            }
            "customer.subscription.deleted" => self.on_subscription_deleted(object).await?,
            "invoice.payment_failed" => self.on_payment_failed(object).await?,
            other => WebhookOutcome::Ignored(format!("unhandled event type {other}")),
        };

        if let WebhookOutcome::Ignored(reason) = &outcome {
            tracing::debug!(event_type, reason, "Stripe webhook ignored");
        }
        Ok(outcome)
    }

    /// Account referenced by metadata, falling back to the Stripe customer
    async fn resolve_account(
        &self,
        object: &Value,
        extra_reference: Option<&str>,
    ) -> Result<Option<AccountModel>, ApiError> {
        let accounts = AccountRepository::new(&self.state.db);

        let referenced = object["metadata"]["account_id"]
            .as_str()
            .or(extra_reference)
            .and_then(|id| Uuid::parse_str(id).ok());
        if let Some(account_id) = referenced {
            if let Some(account) = accounts.find_by_id(account_id).await? {
                return Ok(Some(account));
            }
        }

        match object["customer"].as_str() {
            Some(customer_id) => Ok(accounts.find_by_stripe_customer(customer_id).await?),
            None => Ok(None),
        }
    }

    async fn on_checkout_completed(&self, object: &Value) -> Result<WebhookOutcome, ApiError> {
        let Some(account) = self
            .resolve_account(object, object["client_reference_id"].as_str())
            .await?
        else {
            tracing::warn!("checkout.session.completed for unknown account");
            return Ok(WebhookOutcome::Ignored("unknown account".to_string()));
        };

        AccountRepository::new(&self.state.db)
            .set_stripe_ids(
                account.id,
                object["customer"].as_str(),
                object["subscription"].as_str(),
            )
            .await?;

        self.state.notifications.publish(
            account.id,
            "billing.checkout_completed",
            json!({ "plan": object["metadata"]["plan"] }),
        );
        Ok(WebhookOutcome::Processed)
    }

    fn plan_from_subscription(&self, object: &Value) -> Option<&'static str> {
        if let Some(plan) = object["metadata"]["plan"].as_str().and_then(find_plan) {
            return Some(plan.name);
        }
        object["items"]["data"][0]["price"]["id"]
            .as_str()
            .and_then(|price_id| self.state.config.stripe.plan_for_price(price_id))
    }

    async fn on_subscription_changed(&self, object: &Value) -> Result<WebhookOutcome, ApiError> {
        let (Some(subscription_id), Some(customer_id)) =
            (object["id"].as_str(), object["customer"].as_str())
        else {
            return Ok(WebhookOutcome::Ignored("subscription without id".to_string()));
        };
        let Some(account) = self.resolve_account(object, None).await? else {
            tracing::warn!(subscription_id, "Subscription event for unknown account");
            return Ok(WebhookOutcome::Ignored("unknown account".to_string()));
        };

        let status = object["status"].as_str().unwrap_or("incomplete").to_string();
        let plan = match self.plan_from_subscription(object) {
            Some(plan) => plan.to_string(),
            None => {
                tracing::warn!(subscription_id, "Could not resolve plan for subscription");
                account.plan.clone()
            }
        };

        SubscriptionRepository::new(&self.state.db)
            .upsert(SubscriptionUpsert {
                account_id: account.id,
                stripe_subscription_id: subscription_id.to_string(),
                stripe_customer_id: customer_id.to_string(),
                plan: plan.clone(),
                status: status.clone(),
                current_period_start: unix_time(&object["current_period_start"]),
                current_period_end: unix_time(&object["current_period_end"]),
                cancel_at_period_end: object["cancel_at_period_end"].as_bool().unwrap_or(false),
            })
            .await?;

        let accounts = AccountRepository::new(&self.state.db);
        accounts
            .set_stripe_ids(account.id, Some(customer_id), Some(subscription_id))
            .await?;

        if matches!(status.as_str(), "active" | "trialing") && account.plan != plan {
            accounts.set_plan(account.id, &plan).await?;
            tracing::info!(account_id = %account.id, from = %account.plan, to = %plan, "Account plan changed");
            events::track(
                &self.state.db,
                Some(account.id),
                None,
                "billing.plan_changed",
                json!({ "from": account.plan, "to": plan }),
            )
            .await;
            self.state.notifications.publish(
                account.id,
                "billing.plan_changed",
                json!({ "plan": plan }),
            );
        }

        Ok(WebhookOutcome::Processed)
    }

    async fn on_subscription_deleted(&self, object: &Value) -> Result<WebhookOutcome, ApiError> {
        let Some(subscription_id) = object["id"].as_str() else {
            return Ok(WebhookOutcome::Ignored("subscription without id".to_string()));
        };
        let subscriptions = SubscriptionRepository::new(&self.state.db);

        let account_id = match subscriptions.find_by_stripe_id(subscription_id).await? {
            Some(existing) => {
                let account_id = existing.account_id;
                subscriptions.set_status(existing, "canceled").await?;
                Some(account_id)
            }
            None => self.resolve_account(object, None).await?.map(|a| a.id),
        };
        let Some(account_id) = account_id else {
            tracing::warn!(subscription_id, "Subscription deletion for unknown account");
            return Ok(WebhookOutcome::Ignored("unknown account".to_string()));
        };

        AccountRepository::new(&self.state.db)
            .set_plan(account_id, FREE_PLAN)
            .await?;
        tracing::info!(%account_id, "Subscription canceled; account downgraded to free");
        self.state.notifications.publish(
            account_id,
            "billing.subscription_canceled",
            json!({ "plan": FREE_PLAN }),
        );
        Ok(WebhookOutcome::Processed)
    }

    async fn on_payment_failed(&self, object: &Value) -> Result<WebhookOutcome, ApiError> {
        let subscriptions = SubscriptionRepository::new(&self.state.db);

        let mut account_id = None;
        if let Some(subscription_id) = object["subscription"].as_str() {
            if let Some(existing) = subscriptions.find_by_stripe_id(subscription_id).await? {
                account_id = Some(existing.account_id);
                subscriptions.set_status(existing, "past_due").await?;
            }
        }
        if account_id.is_none() {
            account_id = self.resolve_account(object, None).await?.map(|a| a.id);
        }
        let Some(account_id) = account_id else {
            tracing::warn!("invoice.payment_failed for unknown account");
            return Ok(WebhookOutcome::Ignored("unknown account".to_string()));
        };

        self.state.notifications.publish(
            account_id,
            "billing.payment_failed",
            json!({
                "invoice_id": object["id"],
                "amount_due": object["amount_due"],
            }),
        );
        Ok(WebhookOutcome::Processed)
    }
}

fn unix_time(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_i64()
        .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
}

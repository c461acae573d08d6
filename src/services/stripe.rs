//! Stripe API client.
//!
//! Handlers talk to Stripe through the [`BillingGateway`] trait so tests can
//! point the client at a mock server or substitute it entirely.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::config::StripeConfig;
use crate::error::{ApiError, provider_error, service_unavailable};

const PROVIDER: &str = "stripe";

/// Parameters for a subscription-mode checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutParams {
    pub customer_id: String,
    pub price_id: String,
    pub account_id: Uuid,
    pub plan: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Hosted page the browser is redirected to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostedSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    id: String,
}

/// Operations the billing flow needs from the payment provider
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Create a customer and return its id
    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        account_id: Uuid,
    ) -> Result<String, ApiError>;

    async fn create_checkout_session(
        &self,
        params: CheckoutParams,
    ) -> Result<HostedSession, ApiError>;

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<HostedSession, ApiError>;
}

/// Form-encoded REST client for the Stripe API
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: Client,
    api_base: String,
    secret_key: Option<String>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone().filter(|key| !key.is_empty()),
        }
    }

    fn secret_key(&self) -> Result<&str, ApiError> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| service_unavailable("Billing is not configured"))
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let secret_key = self.secret_key()?;
        let url = format!("{}{}", self.api_base, path);

        let response = self
            .http
            .post(&url)
            .bearer_auth(secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, path, "Stripe request failed");
                provider_error(PROVIDER, 502, Some(e.to_string()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok();
            tracing::warn!(status = status.as_u16(), path, "Stripe returned an error");
            return Err(provider_error(PROVIDER, status.as_u16(), body));
        }

        response.json::<T>().await.map_err(|e| {
            tracing::error!(error = %e, path, "Unexpected Stripe response body");
            provider_error(PROVIDER, status.as_u16(), Some(e.to_string()))
        })
    }
}

#[async_trait]
impl BillingGateway for StripeClient {
    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        account_id: Uuid,
    ) -> Result<String, ApiError> {
        let form = [
            ("email", email.to_string()),
            ("name", name.to_string()),
            ("metadata[account_id]", account_id.to_string()),
        ];
        let customer: CustomerResponse = self.post_form("/v1/customers", &form).await?;
        Ok(customer.id)
    }

    async fn create_checkout_session(
        &self,
        params: CheckoutParams,
    ) -> Result<HostedSession, ApiError> {
        let form = [
            ("mode", "subscription".to_string()),
            ("customer", params.customer_id),
            ("line_items[0][price]", params.price_id),
            ("line_items[0][quantity]", "1".to_string()),
            ("client_reference_id", params.account_id.to_string()),
            ("metadata[account_id]", params.account_id.to_string()),
            ("metadata[plan]", params.plan.clone()),
            (
                "subscription_data[metadata][account_id]",
                params.account_id.to_string(),
            ),
            ("subscription_data[metadata][plan]", params.plan),
            ("success_url", params.success_url),
            ("cancel_url", params.cancel_url),
        ];
        self.post_form("/v1/checkout/sessions", &form).await
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<HostedSession, ApiError> {
        let form = [
            ("customer", customer_id.to_string()),
            ("return_url", return_url.to_string()),
        ];
        self.post_form("/v1/billing_portal/sessions", &form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> StripeClient {
        StripeClient::new(&StripeConfig {
            secret_key: Some("sk_test_123".to_string()),
            api_base: server.uri(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn create_customer_posts_form_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_string_contains("email=owner%40example.com"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "cus_123"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = client_for(&server)
            .create_customer("owner@example.com", "Acme", Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(id, "cus_123");
    }

    #[tokio::test]
    async fn checkout_session_carries_account_metadata() {
        let server = MockServer::start().await;
        let account_id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(body_string_contains("mode=subscription"))
            .and(body_string_contains(format!("client_reference_id={account_id}")))
            .and(body_string_contains("metadata%5Bplan%5D=growth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_test_1",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1"
            })))
            .mount(&server)
            .await;

        let session = client_for(&server)
            .create_checkout_session(CheckoutParams {
                customer_id: "cus_123".to_string(),
                price_id: "price_growth".to_string(),
                account_id,
                plan: "growth".to_string(),
                success_url: "http://localhost:3000/billing?status=success".to_string(),
                cancel_url: "http://localhost:3000/billing?status=cancelled".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.id, "cs_test_1");
    }

    #[tokio::test]
    async fn error_status_maps_to_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/billing_portal/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("x".repeat(500)))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_portal_session("cus_123", "http://localhost:3000/billing")
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(&*err.code, "PROVIDER_ERROR");
    }

    #[tokio::test]
    async fn missing_secret_key_is_service_unavailable() {
        let client = StripeClient::new(&StripeConfig::default());
        let err = client
            .create_customer("owner@example.com", "Acme", Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

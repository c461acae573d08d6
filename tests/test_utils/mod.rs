//! Test utilities for database and HTTP testing.
//!
//! Each test gets its own in-memory SQLite database with all migrations
//! applied and, when needed, a live server bound to a random port.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use metricly::config::{AppConfig, StripeConfig};
use metricly::error::ApiError;
use metricly::models::{ad_account, ad_spend, integration, order};
use metricly::repositories::AccountRepository;
use metricly::server::{AppState, create_app};
use metricly::services::stripe::{BillingGateway, CheckoutParams, HostedSession};
use metricly::services::NotificationHub;
use metricly::{db, seeds};
use reqwest::StatusCode;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Configuration for an isolated in-memory test database.
///
/// A single connection keeps every query on the same SQLite memory database.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        frontend_url: "https://app.metricly.test".to_string(),
        stripe: StripeConfig {
            secret_key: Some("sk_test_123".to_string()),
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            price_starter: Some("price_starter".to_string()),
            price_growth: Some("price_growth".to_string()),
            ..StripeConfig::default()
        },
        ..AppConfig::default()
    };
    config.scheduler.enabled = false;
    config
}

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db(config: &AppConfig) -> Result<DatabaseConnection> {
    let db = db::init_pool(config).await?;
    db::run_migrations(&db).await?;
    seeds::seed_report_templates(&db).await?;
    Ok(db)
}

/// Billing gateway that records calls instead of talking to Stripe.
#[derive(Debug, Default)]
pub struct FakeBilling {
    pub checkouts: Mutex<Vec<CheckoutParams>>,
    pub customers: Mutex<Vec<String>>,
}

#[async_trait]
impl BillingGateway for FakeBilling {
    async fn create_customer(
        &self,
        email: &str,
        _name: &str,
        _account_id: Uuid,
    ) -> Result<String, ApiError> {
        self.customers.lock().unwrap().push(email.to_string());
        Ok(format!("cus_{}", self.customers.lock().unwrap().len()))
    }

    async fn create_checkout_session(
        &self,
        params: CheckoutParams,
    ) -> Result<HostedSession, ApiError> {
        self.checkouts.lock().unwrap().push(params);
        Ok(HostedSession {
            id: "cs_test_1".to_string(),
            url: "https://checkout.stripe.test/cs_test_1".to_string(),
        })
    }

    async fn create_portal_session(
        &self,
        _customer_id: &str,
        return_url: &str,
    ) -> Result<HostedSession, ApiError> {
        Ok(HostedSession {
            id: "bps_test_1".to_string(),
            url: format!("https://billing.stripe.test/session?return={return_url}"),
        })
    }
}

/// A running API server backed by its own database.
pub struct TestApp {
    pub url: String,
    pub state: AppState,
    pub billing: Arc<FakeBilling>,
    pub client: reqwest::Client,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: AppConfig) -> Self {
        let db = setup_test_db(&config).await.expect("test database");
        let billing = Arc::new(FakeBilling::default());
        let state = AppState {
            config: Arc::new(config),
            db,
            billing: billing.clone(),
            notifications: NotificationHub::default(),
        };

        let app = create_app(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join_handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .context("axum server error")
        });

        Self {
            url: format!("http://{addr}"),
            state,
            billing,
            client: reqwest::Client::new(),
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(join_handle),
        }
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.url, path)
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(self.api(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        read(response).await
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.api(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(response).await
    }

    pub async fn patch(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .patch(self.api(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(response).await
    }

    pub async fn delete(&self, token: &str, path: &str) -> StatusCode {
        self.client
            .delete(self.api(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
            .status()
    }

    /// Sign up a fresh account and return `(token, session body)`
    pub async fn signup(&self, email: &str) -> (String, Value) {
        let response = self
            .client
            .post(self.api("/auth/signup"))
            .json(&json!({
                "email": email,
                "password": TEST_PASSWORD,
                "full_name": "Test Owner",
            }))
            .send()
            .await
            .unwrap();
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        let token = body["token"].as_str().unwrap().to_string();
        (token, body)
    }

    pub async fn set_plan(&self, account_id: Uuid, plan: &str) {
        AccountRepository::new(self.db())
            .set_plan(account_id, plan)
            .await
            .unwrap();
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.join_handle.take() {
            handle.await.unwrap().unwrap();
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn read(response: reqwest::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.bytes().await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub fn account_id(session: &Value) -> Uuid {
    session["account"]["id"].as_str().unwrap().parse().unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at_noon(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(12, 0, 0).unwrap().and_utc()
}

/// Insert an order placed at `ordered_at`.
pub async fn insert_order(
    db: &DatabaseConnection,
    account_id: Uuid,
    external_id: &str,
    total_price: f64,
    financial_status: &str,
    is_new_customer: bool,
    ordered_at: DateTime<Utc>,
) -> order::Model {
    order::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(account_id),
        external_id: Set(external_id.to_string()),
        order_number: Set(Some(format!("#{external_id}"))),
        customer_email: Set(Some("buyer@example.com".to_string())),
        total_price: Set(total_price),
        subtotal_price: Set(total_price),
        total_tax: Set(0.0),
        total_discounts: Set(0.0),
        currency: Set("USD".to_string()),
        financial_status: Set(financial_status.to_string()),
        source: Set(Some("web".to_string())),
        utm_campaign: Set(None),
        is_new_customer: Set(is_new_customer),
        ordered_at: Set(ordered_at.into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap()
}

/// Insert a connected integration with one active ad account.
pub async fn insert_connected_integration(
    db: &DatabaseConnection,
    account_id: Uuid,
    platform: &str,
    last_synced_at: Option<DateTime<Utc>>,
) -> (integration::Model, ad_account::Model) {
    let now = Utc::now();
    let integration = integration::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(account_id),
        platform: Set(platform.to_string()),
        status: Set("connected".to_string()),
        external_account_id: Set(Some("ext-1".to_string())),
        oauth_state: Set(None),
        metadata: Set(None),
        connected_at: Set(Some(now.into())),
        last_synced_at: Set(last_synced_at.map(Into::into)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .unwrap();

    let ad_account = ad_account::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(account_id),
        integration_id: Set(integration.id),
        platform: Set(platform.to_string()),
        external_id: Set(format!("act_{}", integration.id.simple())),
        name: Set(format!("{platform} main")),
        currency: Set("USD".to_string()),
        status: Set("active".to_string()),
        last_synced_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .unwrap();

    (integration, ad_account)
}

/// Insert one day of campaign spend.
#[allow(clippy::too_many_arguments)]
pub async fn insert_spend(
    db: &DatabaseConnection,
    ad_account: &ad_account::Model,
    campaign_id: &str,
    day: NaiveDate,
    spend: f64,
    impressions: i64,
    clicks: i64,
    conversion_value: f64,
) -> ad_spend::Model {
    ad_spend::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(ad_account.account_id),
        ad_account_id: Set(ad_account.id),
        platform: Set(ad_account.platform.clone()),
        campaign_id: Set(campaign_id.to_string()),
        campaign_name: Set(format!("Campaign {campaign_id}")),
        date: Set(day),
        spend: Set(spend),
        impressions: Set(impressions),
        clicks: Set(clicks),
        conversions: Set(if conversion_value > 0.0 { 1 } else { 0 }),
        conversion_value: Set(conversion_value),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap()
}

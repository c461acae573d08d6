//! Integration tests for platform connections, ad accounts and tenant isolation

use metricly::config::OAuthClientConfig;
use reqwest::StatusCode;
use serde_json::{Value, json};

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{TestApp, account_id, insert_connected_integration, test_config};

async fn callback(app: &TestApp, platform: &str, code: &str, state: &str) -> (StatusCode, Value) {
    let response = app
        .client
        .get(app.api(&format!("/integrations/{platform}/callback")))
        .query(&[("code", code), ("state", state)])
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap_or(Value::Null))
}

fn state_param(authorize_url: &str) -> String {
    let url = url::Url::parse(authorize_url).unwrap();
    url.query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap()
}

async fn spawn_with_meta_client() -> TestApp {
    let mut config = test_config();
    config.oauth_clients.insert(
        "meta_ads".to_string(),
        OAuthClientConfig {
            client_id: Some("meta-client".to_string()),
            client_secret: Some("meta-secret".to_string()),
        },
    );
    TestApp::spawn_with(config).await
}

#[tokio::test]
async fn oauth_connect_and_callback_flow() {
    let app = spawn_with_meta_client().await;
    let (token, _) = app.signup("oauth@example.com").await;

    let (status, started) = app
        .post(&token, "/integrations/meta_ads/connect", json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{started}");
    assert_eq!(started["integration"]["status"], "pending");
    let authorize_url = started["authorize_url"].as_str().unwrap();
    assert!(authorize_url.starts_with("https://www.facebook.com/v19.0/dialog/oauth"));
    assert!(authorize_url.contains("client_id=meta-client"));
    assert!(authorize_url.contains(
        "redirect_uri=https%3A%2F%2Fapp.metricly.test%2Fintegrations%2Fmeta_ads%2Fcallback"
    ));
    let state = state_param(authorize_url);

    // State is bound to the platform that issued it
    let (status, _) = callback(&app, "google_ads", "code-1", &state).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = callback(&app, "meta_ads", "code-1", "forged").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, connected) = callback(&app, "meta_ads", "code-1", &state).await;
    assert_eq!(status, StatusCode::OK, "{connected}");
    assert_eq!(connected["status"], "connected");
    assert!(connected["connected_at"].is_string());

    // The state is consumed
    let (status, _) = callback(&app, "meta_ads", "code-1", &state).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = app.get(&token, "/integrations").await;
    let integrations = list["data"].as_array().unwrap();
    assert_eq!(integrations.len(), 1);
    assert_eq!(integrations[0]["platform"], "meta_ads");
    assert_eq!(integrations[0]["status"], "connected");

    app.shutdown().await;
}

#[tokio::test]
async fn connect_without_client_stays_pending() {
    let app = TestApp::spawn().await;
    let (token, _) = app.signup("unconfigured@example.com").await;

    let (status, started) = app
        .post(&token, "/integrations/shopify/connect", json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["integration"]["status"], "pending");
    assert!(started["authorize_url"].is_null());

    let (status, _) = app
        .post(&token, "/integrations/myspace/connect", json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.shutdown().await;
}

#[tokio::test]
async fn integration_limit_ignores_disconnected_integrations() {
    let app = TestApp::spawn().await;
    let (token, _) = app.signup("limits@example.com").await;

    let (_, first) = app
        .post(&token, "/integrations/shopify/connect", json!({}))
        .await;

    // Reconnecting the same platform does not use another slot
    let (status, _) = app
        .post(&token, "/integrations/shopify/connect", json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(&token, "/integrations/google_ads/connect", json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["resource"], "integrations");

    let id = first["integration"]["id"].as_str().unwrap();
    let status = app.delete(&token, &format!("/integrations/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .post(&token, "/integrations/google_ads/connect", json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    app.shutdown().await;
}

#[tokio::test]
async fn ad_accounts_can_be_paused_until_disconnected() {
    let app = TestApp::spawn().await;
    let (token, session) = app.signup("adaccounts@example.com").await;
    let (integration, ad_account) =
        insert_connected_integration(app.db(), account_id(&session), "google_ads", None).await;

    let (status, list) = app.get(&token, "/ad-accounts?platform=google_ads").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
    let (_, list) = app.get(&token, "/ad-accounts?platform=meta_ads").await;
    assert!(list["data"].as_array().unwrap().is_empty());

    let path = format!("/ad-accounts/{}", ad_account.id);
    let (status, paused) = app.patch(&token, &path, json!({ "status": "paused" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paused["status"], "paused");

    let (status, _) = app
        .patch(&token, &path, json!({ "status": "disconnected" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let status = app
        .delete(&token, &format!("/integrations/{}", integration.id))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = app.get(&token, "/ad-accounts").await;
    assert_eq!(list["data"][0]["status"], "disconnected");
    let (status, _) = app.patch(&token, &path, json!({ "status": "active" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.shutdown().await;
}

#[tokio::test]
async fn resources_are_invisible_across_accounts() {
    let app = TestApp::spawn().await;
    let (alice, alice_session) = app.signup("alice@alpha.io").await;
    let (mallory, _) = app.signup("mallory@beta.io").await;

    let (integration, ad_account) =
        insert_connected_integration(app.db(), account_id(&alice_session), "meta_ads", None).await;
    let (_, view) = app
        .post(&alice, "/views", json!({ "name": "Mine", "page": "dashboard" }))
        .await;
    let (_, report) = app
        .post(
            &alice,
            "/reports/custom",
            json!({ "name": "Mine", "metrics": ["revenue"], "date_range": "last_7_days" }),
        )
        .await;

    let report_id = report["id"].as_str().unwrap();
    let view_id = view["id"].as_str().unwrap();

    let (status, _) = app.get(&mallory, &format!("/reports/custom/{report_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .patch(&mallory, &format!("/views/{view_id}"), json!({ "name": "Stolen" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .patch(
            &mallory,
            &format!("/ad-accounts/{}", ad_account.id),
            json!({ "status": "paused" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let status = app
        .delete(&mallory, &format!("/integrations/{}", integration.id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = app.get(&mallory, "/integrations").await;
    assert!(list["data"].as_array().unwrap().is_empty());
    let (_, list) = app.get(&mallory, "/reports/custom").await;
    assert!(list["data"].as_array().unwrap().is_empty());

    // Alice still owns everything
    let (status, _) = app.get(&alice, &format!("/reports/custom/{report_id}")).await;
    assert_eq!(status, StatusCode::OK);

    app.shutdown().await;
}

//! Integration tests for signup, login and bearer authentication

use reqwest::StatusCode;
use serde_json::json;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{TEST_PASSWORD, TestApp};

#[tokio::test]
async fn signup_creates_owner_on_free_plan() {
    let app = TestApp::spawn().await;

    let (token, session) = app.signup("Founder@Acme.io").await;

    assert!(!token.is_empty());
    assert_eq!(session["token_type"], "Bearer");
    assert_eq!(session["user"]["email"], "founder@acme.io");
    assert_eq!(session["user"]["role"], "owner");
    assert_eq!(session["account"]["plan"], "free");
    assert_eq!(session["account"]["name"], "acme.io");

    app.shutdown().await;
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::spawn().await;
    app.signup("dup@example.com").await;

    let response = app
        .client
        .post(app.api("/auth/signup"))
        .json(&json!({ "email": "DUP@example.com", "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    app.shutdown().await;
}

#[tokio::test]
async fn signup_validates_email_and_password() {
    let app = TestApp::spawn().await;

    for body in [
        json!({ "email": "not-an-email", "password": TEST_PASSWORD }),
        json!({ "email": "short@example.com", "password": "short" }),
    ] {
        let response = app
            .client
            .post(app.api("/auth/signup"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }

    app.shutdown().await;
}

#[tokio::test]
async fn login_returns_token_usable_for_me() {
    let app = TestApp::spawn().await;
    app.signup("login@example.com").await;

    let response = app
        .client
        .post(app.api("/auth/login"))
        .json(&json!({ "email": "login@example.com", "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session: serde_json::Value = response.json().await.unwrap();
    let token = session["token"].as_str().unwrap();

    let (status, me) = app.get(token, "/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["email"], "login@example.com");
    assert_eq!(me["account"]["id"], session["account"]["id"]);

    app.shutdown().await;
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::spawn().await;
    app.signup("wrong@example.com").await;

    let response = app
        .client
        .post(app.api("/auth/login"))
        .json(&json!({ "email": "wrong@example.com", "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .post(app.api("/auth/login"))
        .json(&json!({ "email": "nobody@example.com", "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.shutdown().await;
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.api("/auth/me")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("x-trace-id"));
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get("not.a.jwt", "/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.shutdown().await;
}

#[tokio::test]
async fn account_profile_can_be_updated_by_owner() {
    let app = TestApp::spawn().await;
    let (token, _) = app.signup("owner@shop.io").await;

    let (status, account) = app
        .patch(
            &token,
            "/account",
            json!({ "name": "Shop Inc", "timezone": "Europe/Berlin", "currency": "EUR" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["name"], "Shop Inc");
    assert_eq!(account["timezone"], "Europe/Berlin");
    assert_eq!(account["currency"], "EUR");

    let (status, _) = app
        .patch(&token, "/account", json!({ "currency": "euros" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.shutdown().await;
}

#[tokio::test]
async fn health_endpoints_are_public() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/healthz", app.url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .get(format!("{}/readyz", app.url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    app.shutdown().await;
}

//! Integration tests for team membership and invitations

use chrono::{Duration, Utc};
use metricly::models::{TeamInvite, team_invite};
use reqwest::StatusCode;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde_json::{Value, json};
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{TEST_PASSWORD, TestApp, account_id};

async fn accept(app: &TestApp, token: &str) -> (StatusCode, Value) {
    let response = app
        .client
        .post(app.api("/team/invites/accept"))
        .json(&json!({ "token": token, "password": TEST_PASSWORD, "full_name": "New Hire" }))
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
async fn free_plan_has_a_single_seat() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.signup("solo@example.com").await;

    let (status, body) = app
        .post(
            &owner,
            "/team/invites",
            json!({ "email": "friend@example.com", "role": "member" }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PLAN_LIMIT_REACHED");
    assert_eq!(body["details"]["resource"], "users");
    app.shutdown().await;
}

#[tokio::test]
async fn invite_accept_and_role_management() {
    let app = TestApp::spawn().await;
    let (owner, session) = app.signup("owner@team.io").await;
    app.set_plan(account_id(&session), "starter").await;

    let (status, invite) = app
        .post(
            &owner,
            "/team/invites",
            json!({ "email": "Analyst@Team.io", "role": "viewer" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invite["email"], "analyst@team.io");
    assert_eq!(invite["status"], "pending");
    let invite_token = invite["token"].as_str().unwrap().to_string();
    assert!(invite["accept_url"].as_str().unwrap().ends_with(&invite_token));

    // A second pending invite for the same address conflicts
    let (status, _) = app
        .post(
            &owner,
            "/team/invites",
            json!({ "email": "analyst@team.io", "role": "member" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, joined) = accept(&app, &invite_token).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(joined["user"]["role"], "viewer");
    assert_eq!(joined["account"]["id"], session["account"]["id"]);
    let viewer = joined["token"].as_str().unwrap().to_string();
    let viewer_id = joined["user"]["id"].as_str().unwrap().to_string();

    // Tokens are single use
    let (status, _) = accept(&app, &invite_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Viewers cannot manage the team
    let (status, _) = app
        .post(
            &viewer,
            "/team/invites",
            json!({ "email": "other@team.io", "role": "viewer" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, members) = app.get(&owner, "/team/members").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members["data"].as_array().unwrap().len(), 2);

    let (status, promoted) = app
        .patch(
            &owner,
            &format!("/team/members/{viewer_id}"),
            json!({ "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(promoted["role"], "admin");

    // Admins may invite now that the role took effect
    let (status, _) = app
        .post(
            &viewer,
            "/team/invites",
            json!({ "email": "third@team.io", "role": "member" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let status = app
        .delete(&owner, &format!("/team/members/{viewer_id}"))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    app.shutdown().await;
}

#[tokio::test]
async fn last_owner_cannot_be_demoted_or_removed() {
    let app = TestApp::spawn().await;
    let (owner, session) = app.signup("keeper@example.com").await;
    let owner_id = session["user"]["id"].as_str().unwrap();

    let (status, _) = app
        .patch(
            &owner,
            &format!("/team/members/{owner_id}"),
            json!({ "role": "member" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let status = app
        .delete(&owner, &format!("/team/members/{owner_id}"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.shutdown().await;
}

#[tokio::test]
async fn revoked_invites_cannot_be_accepted() {
    let app = TestApp::spawn().await;
    let (owner, session) = app.signup("lead@example.com").await;
    app.set_plan(account_id(&session), "growth").await;

    let (_, invite) = app
        .post(
            &owner,
            "/team/invites",
            json!({ "email": "temp@example.com", "role": "member" }),
        )
        .await;
    let invite_id = invite["id"].as_str().unwrap();
    let invite_token = invite["token"].as_str().unwrap();

    let status = app
        .delete(&owner, &format!("/team/invites/{invite_id}"))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = accept(&app, invite_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, invites) = app.get(&owner, "/team/invites").await;
    assert!(invites["data"].as_array().unwrap().is_empty());

    app.shutdown().await;
}

#[tokio::test]
async fn owner_role_cannot_be_invited() {
    let app = TestApp::spawn().await;
    let (owner, session) = app.signup("boss@example.com").await;
    app.set_plan(account_id(&session), "starter").await;

    let (status, _) = app
        .post(
            &owner,
            "/team/invites",
            json!({ "email": "co@example.com", "role": "owner" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.shutdown().await;
}

/// Move an invite's expiry into the past
async fn backdate_invite(app: &TestApp, invite_id: Uuid) {
    let mut invite = TeamInvite::find_by_id(invite_id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap()
        .into_active_model();
    invite.expires_at = Set((Utc::now() - Duration::hours(1)).into());
    invite.update(app.db()).await.unwrap();
}

async fn invite_status(app: &TestApp, invite_id: Uuid) -> String {
    TeamInvite::find_by_id(invite_id)
        .one(app.db())
        .await
        .unwrap()
        .map(|invite: team_invite::Model| invite.status)
        .unwrap()
}

#[tokio::test]
async fn expired_invites_are_rejected_on_accept() {
    let app = TestApp::spawn().await;
    let (owner, session) = app.signup("late@example.com").await;
    app.set_plan(account_id(&session), "starter").await;

    let (status, invite) = app
        .post(
            &owner,
            "/team/invites",
            json!({ "email": "slow@example.com", "role": "viewer" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{invite}");
    let invite_id: Uuid = invite["id"].as_str().unwrap().parse().unwrap();
    backdate_invite(&app, invite_id).await;

    let (status, body) = accept(&app, invite["token"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invite has expired");
    assert_eq!(invite_status(&app, invite_id).await, "expired");

    // Once expired the token is no longer pending at all
    let (status, body) = accept(&app, invite["token"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invite is invalid or has already been used");

    let (_, members) = app.get(&owner, "/team/members").await;
    assert_eq!(members["data"].as_array().unwrap().len(), 1);

    app.shutdown().await;
}

#[tokio::test]
async fn listing_invites_expires_stale_ones() {
    let app = TestApp::spawn().await;
    let (owner, session) = app.signup("tidy@example.com").await;
    app.set_plan(account_id(&session), "growth").await;

    let mut ids = Vec::new();
    for email in ["stale@example.com", "fresh@example.com"] {
        let (_, invite) = app
            .post(
                &owner,
                "/team/invites",
                json!({ "email": email, "role": "member" }),
            )
            .await;
        ids.push(invite["id"].as_str().unwrap().parse::<Uuid>().unwrap());
    }
    backdate_invite(&app, ids[0]).await;
    assert_eq!(invite_status(&app, ids[0]).await, "pending");

    let (status, invites) = app.get(&owner, "/team/invites").await;
    assert_eq!(status, StatusCode::OK);
    let statuses: Vec<(String, String)> = invites["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|invite| {
            (
                invite["email"].as_str().unwrap().to_string(),
                invite["status"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert!(statuses.contains(&("stale@example.com".to_string(), "expired".to_string())));
    assert!(statuses.contains(&("fresh@example.com".to_string(), "pending".to_string())));
    assert_eq!(invite_status(&app, ids[0]).await, "expired");

    app.shutdown().await;
}

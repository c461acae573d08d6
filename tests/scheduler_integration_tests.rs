//! Integration tests for the background scheduler tick

use chrono::{DateTime, Duration, Utc};
use metricly::models::{ad_account, integration};
use metricly::scheduler::{Scheduler, TickStats};
use reqwest::StatusCode;
use sea_orm::EntityTrait;
use serde_json::json;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{TestApp, account_id, insert_connected_integration};

fn scheduler(app: &TestApp) -> Scheduler {
    Scheduler::new(
        app.state.config.clone(),
        app.state.db.clone(),
        app.state.notifications.clone(),
    )
}

#[tokio::test]
async fn tick_syncs_only_stale_connected_integrations() {
    let app = TestApp::spawn().await;
    let (_, session) = app.signup("sync@example.com").await;
    app.set_plan(account_id(&session), "starter").await;
    let account = account_id(&session);

    let now = Utc::now();
    let (never, never_ad) = insert_connected_integration(app.db(), account, "meta_ads", None).await;
    let (fresh, _) = insert_connected_integration(
        app.db(),
        account,
        "google_ads",
        Some(now - Duration::minutes(10)),
    )
    .await;

    let mut notifications = app.state.notifications.subscribe();
    let stats = scheduler(&app).tick(now).await.unwrap();
    assert_eq!(
        stats,
        TickStats {
            integrations_synced: 1,
            ad_accounts_stamped: 1,
            reports_sent: 0,
            errors: 0,
        }
    );

    let synced = integration::Entity::find_by_id(never.id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert!(synced.last_synced_at.is_some());
    let stamped = ad_account::Entity::find_by_id(never_ad.id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert!(stamped.last_synced_at.is_some());

    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.kind, "integration.synced");
    assert_eq!(notification.account_id, account);

    // Two hours later both are stale
    let stats = scheduler(&app)
        .tick(now + Duration::hours(2))
        .await
        .unwrap();
    assert_eq!(stats.integrations_synced, 2);

    let fresh = integration::Entity::find_by_id(fresh.id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert!(fresh.last_synced_at.unwrap().with_timezone(&Utc) > now);

    app.shutdown().await;
}

#[tokio::test]
async fn tick_sends_due_reports_and_schedules_the_next_run() {
    let app = TestApp::spawn().await;
    let (token, session) = app.signup("digest@example.com").await;
    app.set_plan(account_id(&session), "starter").await;

    let (status, report) = app
        .post(
            &token,
            "/reports/scheduled",
            json!({
                "name": "Daily digest",
                "report_type": "summary",
                "frequency": "daily",
                "recipients": ["team@example.com"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let first_run: DateTime<Utc> = serde_json::from_value(report["next_run_at"].clone()).unwrap();

    // Nothing due yet
    let stats = scheduler(&app).tick(Utc::now()).await.unwrap();
    assert_eq!(stats.reports_sent, 0);

    // A tick well past the due time catches up from the tick itself
    let late = first_run + Duration::days(3);
    let stats = scheduler(&app).tick(late).await.unwrap();
    assert_eq!(stats.reports_sent, 1);

    let (_, list) = app.get(&token, "/reports/scheduled").await;
    let sent = &list["data"][0];
    let last_sent: DateTime<Utc> = serde_json::from_value(sent["last_sent_at"].clone()).unwrap();
    let next_run: DateTime<Utc> = serde_json::from_value(sent["next_run_at"].clone()).unwrap();
    assert_eq!(last_sent.timestamp(), late.timestamp());
    assert_eq!(next_run.timestamp(), (late + Duration::days(1)).timestamp());

    // Paused reports are skipped
    let id = sent["id"].as_str().unwrap();
    app.patch(&token, &format!("/reports/scheduled/{id}"), json!({ "is_active": false }))
        .await;
    let stats = scheduler(&app)
        .tick(late + Duration::days(5))
        .await
        .unwrap();
    assert_eq!(stats.reports_sent, 0);

    app.shutdown().await;
}

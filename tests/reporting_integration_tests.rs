//! Integration tests for saved views, custom metrics and reports

use chrono::{Duration, Utc};
use reqwest::StatusCode;
use sea_orm::ConnectionTrait;
use serde_json::json;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{TestApp, account_id, insert_connected_integration, insert_order, insert_spend};

#[tokio::test]
async fn saved_views_keep_one_default_per_page() {
    let app = TestApp::spawn().await;
    let (token, _) = app.signup("views@example.com").await;

    let (status, first) = app
        .post(
            &token,
            "/views",
            json!({ "name": "Meta only", "page": "campaigns", "filters": { "platform": "meta_ads" }, "is_default": true }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["is_default"], true);

    let (status, second) = app
        .post(
            &token,
            "/views",
            json!({ "name": "Everything", "page": "campaigns", "is_default": true }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["filters"], json!({}));

    let (_, list) = app.get(&token, "/views?page=campaigns").await;
    let views = list["data"].as_array().unwrap();
    assert_eq!(views.len(), 2);
    let defaults: Vec<_> = views.iter().filter(|v| v["is_default"] == true).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["id"], second["id"]);

    let (status, renamed) = app
        .patch(
            &token,
            &format!("/views/{}", first["id"].as_str().unwrap()),
            json!({ "name": "Meta campaigns" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Meta campaigns");

    let status = app
        .delete(&token, &format!("/views/{}", first["id"].as_str().unwrap()))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = app.get(&token, "/views").await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    app.shutdown().await;
}

#[tokio::test]
async fn failed_default_view_write_keeps_the_previous_default() {
    let app = TestApp::spawn().await;
    let (token, _) = app.signup("atomic-views@example.com").await;

    let (status, original) = app
        .post(
            &token,
            "/views",
            json!({ "name": "Main", "page": "dashboard", "is_default": true }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Fail writes of one specific view after the old default was cleared
    app.db()
        .execute_unprepared(
            "CREATE TRIGGER reject_broken_view BEFORE INSERT ON saved_views \
             WHEN NEW.name = 'Broken' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .await
        .unwrap();

    let (status, _) = app
        .post(
            &token,
            "/views",
            json!({ "name": "Broken", "page": "dashboard", "is_default": true }),
        )
        .await;
    assert!(status.is_server_error(), "{status}");

    let (_, list) = app.get(&token, "/views?page=dashboard").await;
    let views = list["data"].as_array().unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0]["id"], original["id"]);
    assert_eq!(views[0]["is_default"], true);

    app.shutdown().await;
}

#[tokio::test]
async fn saved_views_are_validated_and_limited() {
    let app = TestApp::spawn().await;
    let (token, _) = app.signup("view-limits@example.com").await;

    let (status, _) = app
        .post(&token, "/views", json!({ "name": "x", "page": "settings" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &token,
            "/views",
            json!({ "name": "x", "page": "dashboard", "filters": ["meta_ads"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for n in 0..3 {
        let (status, _) = app
            .post(&token, "/views", json!({ "name": format!("View {n}"), "page": "dashboard" }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, body) = app
        .post(&token, "/views", json!({ "name": "One too many", "page": "dashboard" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["resource"], "saved_views");

    app.shutdown().await;
}

#[tokio::test]
async fn custom_metrics_need_a_paid_plan_and_evaluate_formulas() {
    let app = TestApp::spawn().await;
    let (token, session) = app.signup("formulas@example.com").await;
    let account = account_id(&session);

    let request = json!({ "name": "Profit", "formula": "revenue - ad_spend", "format": "currency" });
    let (status, body) = app.post(&token, "/custom-metrics", request.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["resource"], "custom_metrics");

    app.set_plan(account, "starter").await;
    let (status, metric) = app.post(&token, "/custom-metrics", request.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{metric}");
    assert_eq!(metric["key"], "profit");

    let (status, _) = app.post(&token, "/custom-metrics", request).await;
    assert_eq!(status, StatusCode::CONFLICT);

    for bad in [
        json!({ "name": "Revenue", "formula": "orders * 2" }),
        json!({ "name": "Margin", "formula": "revenue * margin" }),
        json!({ "name": "Broken", "formula": "(revenue - " }),
        json!({ "name": "Styled", "formula": "revenue", "format": "emoji" }),
    ] {
        let (status, body) = app.post(&token, "/custom-metrics", bad.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}: {body}");
    }

    let db = app.db();
    insert_order(db, account, "5001", 300.0, "paid", true, Utc::now() - Duration::hours(1)).await;
    let (_, meta) = insert_connected_integration(db, account, "meta_ads", None).await;
    insert_spend(db, &meta, "c1", Utc::now().date_naive(), 120.0, 1000, 10, 0.0).await;

    let id = metric["id"].as_str().unwrap();
    let (status, value) = app
        .get(&token, &format!("/custom-metrics/{id}/value"))
        .await;
    assert_eq!(status, StatusCode::OK, "{value}");
    assert_eq!(value["value"], 180.0);

    let (status, updated) = app
        .patch(
            &token,
            &format!("/custom-metrics/{id}"),
            json!({ "formula": "revenue / ad_spend" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["formula"], "revenue / ad_spend");

    let (_, value) = app
        .get(&token, &format!("/custom-metrics/{id}/value"))
        .await;
    assert_eq!(value["value"], 2.5);

    app.shutdown().await;
}

#[tokio::test]
async fn custom_reports_run_base_and_custom_metrics() {
    let app = TestApp::spawn().await;
    let (token, session) = app.signup("reports@example.com").await;
    let account = account_id(&session);
    app.set_plan(account, "starter").await;

    let (status, metric) = app
        .post(
            &token,
            "/custom-metrics",
            json!({ "name": "Double revenue", "formula": "revenue * 2" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(metric["key"], "double_revenue");

    insert_order(app.db(), account, "7001", 40.0, "paid", false, Utc::now() - Duration::hours(1)).await;

    let (status, _) = app
        .post(
            &token,
            "/reports/custom",
            json!({ "name": "Bad", "metrics": ["revenue", "bogus"], "date_range": "last_7_days" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &token,
            "/reports/custom",
            json!({ "name": "Bad", "metrics": ["revenue"], "date_range": "forever" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = app
        .post(
            &token,
            "/reports/custom",
            json!({
                "name": "Weekly revenue",
                "metrics": ["revenue", "orders", "double_revenue"],
                "dimensions": ["date"],
                "date_range": "last_7_days"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{report}");
    let id = report["id"].as_str().unwrap();

    let (status, run) = app
        .post(&token, &format!("/reports/custom/{id}/run"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{run}");
    assert_eq!(run["values"]["revenue"], 40.0);
    assert_eq!(run["values"]["orders"], 1.0);
    assert_eq!(run["values"]["double_revenue"], 80.0);
    assert_eq!(run["range"]["end"], Utc::now().date_naive().to_string());

    // Renaming keeps the key the report refers to
    let (status, renamed) = app
        .patch(
            &token,
            &format!("/custom-metrics/{}", metric["id"].as_str().unwrap()),
            json!({ "name": "Revenue times two" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{renamed}");
    assert_eq!(renamed["name"], "Revenue times two");
    assert_eq!(renamed["key"], "double_revenue");
    let (_, run) = app
        .post(&token, &format!("/reports/custom/{id}/run"), json!({}))
        .await;
    assert_eq!(run["values"]["double_revenue"], 80.0);

    // Deleting the custom metric leaves the report runnable
    let status = app
        .delete(&token, &format!("/custom-metrics/{}", metric["id"].as_str().unwrap()))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, run) = app
        .post(&token, &format!("/reports/custom/{id}/run"), json!({}))
        .await;
    assert_eq!(run["values"]["double_revenue"], 0.0);

    let (status, fetched) = app.get(&token, &format!("/reports/custom/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Weekly revenue");

    let status = app.delete(&token, &format!("/reports/custom/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&token, &format!("/reports/custom/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.shutdown().await;
}

#[tokio::test]
async fn templates_create_custom_reports() {
    let app = TestApp::spawn().await;
    let (token, _) = app.signup("templates@example.com").await;

    let (status, list) = app.get(&token, "/reports/templates").await;
    assert_eq!(status, StatusCode::OK);
    let templates = list["data"].as_array().unwrap();
    assert_eq!(templates.len(), 4);
    assert!(templates.iter().all(|t| t["is_system"] == true));

    let overview = templates
        .iter()
        .find(|t| t["name"] == "Executive Overview")
        .unwrap();
    let (status, report) = app
        .post(
            &token,
            &format!("/reports/templates/{}/use", overview["id"].as_str().unwrap()),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{report}");
    assert_eq!(report["name"], "Executive Overview");
    assert_eq!(report["date_range"], "last_30_days");
    assert_eq!(report["metrics"], json!(["revenue", "orders", "aov", "ad_spend", "roas"]));

    // Free plan allows a single custom report
    let (status, body) = app
        .post(
            &token,
            &format!("/reports/templates/{}/use", overview["id"].as_str().unwrap()),
            json!({ "name": "Second copy" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["resource"], "custom_reports");

    app.shutdown().await;
}

#[tokio::test]
async fn scheduled_reports_follow_plan_limits_and_validation() {
    let app = TestApp::spawn().await;
    let (token, session) = app.signup("schedules@example.com").await;

    let request = json!({
        "name": "Monday digest",
        "report_type": "summary",
        "frequency": "weekly",
        "recipients": ["Ops@Example.com", "ops@example.com", "ceo@example.com"]
    });
    let (status, body) = app.post(&token, "/reports/scheduled", request.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["resource"], "scheduled_reports");

    app.set_plan(account_id(&session), "starter").await;
    let (status, report) = app.post(&token, "/reports/scheduled", request).await;
    assert_eq!(status, StatusCode::CREATED, "{report}");
    assert_eq!(report["recipients"], json!(["ops@example.com", "ceo@example.com"]));
    assert_eq!(report["is_active"], true);

    for bad in [
        json!({ "name": "x", "report_type": "summary", "frequency": "hourly", "recipients": ["a@example.com"] }),
        json!({ "name": "x", "report_type": "pivot", "frequency": "daily", "recipients": ["a@example.com"] }),
        json!({ "name": "x", "report_type": "summary", "frequency": "daily", "recipients": [] }),
        json!({ "name": "x", "report_type": "summary", "frequency": "daily", "recipients": ["nope"] }),
    ] {
        let (status, body) = app.post(&token, "/reports/scheduled", bad.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}: {body}");
    }

    let id = report["id"].as_str().unwrap();
    let (status, paused) = app
        .patch(
            &token,
            &format!("/reports/scheduled/{id}"),
            json!({ "is_active": false, "frequency": "daily" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paused["is_active"], false);
    assert_eq!(paused["frequency"], "daily");

    let (_, list) = app.get(&token, "/reports/scheduled").await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let status = app.delete(&token, &format!("/reports/scheduled/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    app.shutdown().await;
}

//! Integration tests for dashboard metrics

use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{
    TestApp, account_id, at_noon, date, insert_connected_integration, insert_order, insert_spend,
};

const RANGE: &str = "start_date=2024-03-01&end_date=2024-03-07";

fn approx(value: &Value, expected: f64) -> bool {
    (value.as_f64().unwrap() - expected).abs() < 1e-9
}

/// Orders and spend inside and around the first week of March 2024
async fn seed(app: &TestApp, account: Uuid) {
    let db = app.db();
    insert_order(db, account, "1001", 100.0, "paid", true, at_noon(date(2024, 3, 2))).await;
    insert_order(db, account, "1002", 50.0, "paid", false, at_noon(date(2024, 3, 2))).await;
    insert_order(db, account, "1003", 30.0, "refunded", true, at_noon(date(2024, 3, 3))).await;
    insert_order(db, account, "1004", 70.0, "partially_refunded", false, at_noon(date(2024, 3, 5))).await;
    // Previous period
    insert_order(db, account, "0999", 110.0, "paid", true, at_noon(date(2024, 2, 27))).await;

    let (_, meta) = insert_connected_integration(db, account, "meta_ads", None).await;
    let (_, google) = insert_connected_integration(db, account, "google_ads", None).await;
    insert_spend(db, &meta, "c1", date(2024, 3, 2), 40.0, 1000, 50, 120.0).await;
    insert_spend(db, &meta, "c1", date(2024, 3, 3), 10.0, 200, 10, 0.0).await;
    insert_spend(db, &google, "c2", date(2024, 3, 5), 10.0, 300, 0, 15.0).await;
}

#[tokio::test]
async fn summary_excludes_refunded_and_voided_orders() {
    let app = TestApp::spawn().await;
    let (token, session) = app.signup("metrics@example.com").await;
    seed(&app, account_id(&session)).await;

    let (status, body) = app.get(&token, &format!("/metrics/summary?{RANGE}")).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let summary = &body["summary"];
    assert!(approx(&summary["revenue"], 220.0));
    assert_eq!(summary["orders"], 3);
    assert!(approx(&summary["aov"], 220.0 / 3.0));
    assert!(approx(&summary["ad_spend"], 60.0));
    assert!(approx(&summary["roas"], 220.0 / 60.0));
    assert_eq!(summary["new_customers"], 1);
    assert_eq!(summary["impressions"], 1500);
    assert_eq!(summary["clicks"], 60);
    assert!(approx(&summary["ctr"], 0.04));
    assert!(approx(&summary["cpc"], 1.0));
    assert!(body["previous"].is_null());

    app.shutdown().await;
}

#[tokio::test]
async fn summary_comparison_uses_preceding_period() {
    let app = TestApp::spawn().await;
    let (token, session) = app.signup("compare@example.com").await;
    seed(&app, account_id(&session)).await;

    let (status, body) = app
        .get(&token, &format!("/metrics/summary?{RANGE}&compare=true"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let previous = &body["previous"];
    assert_eq!(previous["range"]["start"], "2024-02-23");
    assert_eq!(previous["range"]["end"], "2024-02-29");
    assert!(approx(&previous["summary"]["revenue"], 110.0));
    assert!(approx(&previous["change"]["revenue"], 100.0 * (220.0 - 110.0) / 110.0));
    // No spend before, so no percentage
    assert!(previous["change"]["ad_spend"].is_null());

    app.shutdown().await;
}

#[tokio::test]
async fn daily_series_is_dense_after_rebuild() {
    let app = TestApp::spawn().await;
    let (token, session) = app.signup("daily@example.com").await;
    seed(&app, account_id(&session)).await;

    let (status, body) = app
        .post(
            &token,
            "/metrics/rebuild",
            serde_json::json!({ "start_date": "2024-03-01", "end_date": "2024-03-07" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["days"], 7);

    let (status, body) = app.get(&token, &format!("/metrics/daily?{RANGE}")).await;
    assert_eq!(status, StatusCode::OK);
    let points = body["data"].as_array().unwrap();
    assert_eq!(points.len(), 7);
    assert_eq!(points[0]["date"], "2024-03-01");
    assert!(approx(&points[0]["revenue"], 0.0));
    assert_eq!(points[1]["date"], "2024-03-02");
    assert!(approx(&points[1]["revenue"], 150.0));
    assert_eq!(points[1]["orders"], 2);
    assert!(approx(&points[1]["ad_spend"], 40.0));
    // Refund on the 3rd contributes nothing
    assert!(approx(&points[2]["revenue"], 0.0));
    assert!(approx(&points[2]["ad_spend"], 10.0));

    app.shutdown().await;
}

#[tokio::test]
async fn campaigns_sorted_by_spend_with_platform_filter() {
    let app = TestApp::spawn().await;
    let (token, session) = app.signup("campaigns@example.com").await;
    seed(&app, account_id(&session)).await;

    let (status, body) = app.get(&token, &format!("/metrics/campaigns?{RANGE}")).await;
    assert_eq!(status, StatusCode::OK);
    let campaigns = body["data"].as_array().unwrap();
    assert_eq!(campaigns.len(), 2);
    assert_eq!(campaigns[0]["campaign_id"], "c1");
    assert!(approx(&campaigns[0]["spend"], 50.0));
    assert!(approx(&campaigns[0]["roas"], 120.0 / 50.0));
    assert_eq!(campaigns[1]["campaign_id"], "c2");

    let (_, body) = app
        .get(&token, &format!("/metrics/campaigns?{RANGE}&platform=google_ads"))
        .await;
    let campaigns = body["data"].as_array().unwrap();
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0]["platform"], "google_ads");

    app.shutdown().await;
}

#[tokio::test]
async fn orders_paginate_newest_first_with_cursor() {
    let app = TestApp::spawn().await;
    let (token, session) = app.signup("orders@example.com").await;
    seed(&app, account_id(&session)).await;

    let (status, first) = app
        .get(&token, &format!("/metrics/orders?{RANGE}&limit=2"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["has_more"], true);
    let page = first["data"].as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["external_id"], "1004");
    assert_eq!(page[1]["external_id"], "1003");

    let cursor = first["next_cursor"].as_str().unwrap();
    let (status, second) = app
        .get(
            &token,
            &format!("/metrics/orders?{RANGE}&limit=2&cursor={cursor}"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let page = second["data"].as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(second["has_more"], false);
    assert!(second["next_cursor"].is_null());

    app.shutdown().await;
}

#[tokio::test]
async fn invalid_ranges_limits_and_cursors_are_rejected() {
    let app = TestApp::spawn().await;
    let (token, _) = app.signup("invalid@example.com").await;

    for path in [
        "/metrics/summary?start_date=2024-03-10&end_date=2024-03-01",
        "/metrics/summary?start_date=2022-01-01&end_date=2024-01-01",
        "/metrics/orders?limit=0",
        "/metrics/orders?limit=101",
        "/metrics/orders?cursor=not*a*cursor",
        "/metrics/summary?start_date=yesterday",
        "/metrics/summary?start_date=%2B262142-12-31&end_date=%2B262142-12-31",
        "/metrics/summary?end_date=-262143-01-01",
        "/metrics/daily?start_date=%2B262142-12-31&end_date=%2B262142-12-31",
    ] {
        let (status, body) = app.get(&token, path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}: {body}");
    }

    app.shutdown().await;
}

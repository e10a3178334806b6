mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use common::app::spawn_test_app;
use common::fixtures::at;
use common::http::{assert_json_error, request, response_json};

const ALL_METRICS: [&str; 5] = [
    "step_count",
    "heart_rate",
    "sleep_analysis",
    "active_energy",
    "distance",
];

async fn authorize(app: &axum::Router, user: Uuid, metrics: &[&str]) {
    let resp = request(
        app,
        Method::PUT,
        &format!("/api/users/{user}/authorization"),
        Some(json!({ "granted": true, "metrics": metrics })),
    )
    .await;
    let (status, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tracked"], true);
}

async fn post_samples(app: &axum::Router, user: Uuid, metric: &str, rows: &[(u32, u32, f64)]) {
    let samples: Vec<_> = rows
        .iter()
        .map(|(h, m, v)| json!({ "timestamp": at(*h, *m), "value": v }))
        .collect();
    let resp = request(
        app,
        Method::POST,
        &format!("/api/users/{user}/samples"),
        Some(json!({ "metric": metric, "samples": samples })),
    )
    .await;
    let (status, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["recorded"], rows.len());
}

#[tokio::test]
async fn health_endpoints_answer() {
    let t = spawn_test_app();

    let live = request(&t.app, Method::GET, "/health/live", None).await;
    assert_eq!(live.status(), StatusCode::OK);

    let ready = request(&t.app, Method::GET, "/health/ready", None).await;
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn ingested_day_refreshes_and_reads_back() {
    let t = spawn_test_app();
    let user = Uuid::new_v4();
    authorize(&t.app, user, &ALL_METRICS).await;

    let tracked = t.store.list_tracked_users().unwrap();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].user_id, user);

    post_samples(&t.app, user, "step_count", &[(8, 0, 500.0), (12, 0, 300.0), (18, 0, 200.0)]).await;
    post_samples(&t.app, user, "heart_rate", &[(8, 0, 60.0), (12, 0, 70.0), (18, 0, 80.0)]).await;
    post_samples(&t.app, user, "active_energy", &[(9, 0, 120.5), (17, 0, 80.0)]).await;
    post_samples(&t.app, user, "distance", &[(9, 0, 1500.0), (17, 0, 2500.0)]).await;

    let sleep = request(
        &t.app,
        Method::POST,
        &format!("/api/users/{user}/sleep"),
        Some(json!({
            "intervals": [
                { "start": at(0, 0) - Duration::hours(1), "end": at(6, 0), "state": "asleep_core" },
                { "start": at(6, 0), "end": at(6, 30), "state": "awake" },
            ]
        })),
    )
    .await;
    let (status, body) = response_json(sleep).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["recorded"], 2);

    let refreshed = request(
        &t.app,
        Method::POST,
        &format!("/api/users/{user}/aggregates/2025-03-14/refresh"),
        None,
    )
    .await;
    let (status, body) = response_json(refreshed).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);

    let fetched = request(
        &t.app,
        Method::GET,
        &format!("/api/users/{user}/aggregates/2025-03-14"),
        None,
    )
    .await;
    let (status, row) = response_json(fetched).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["data"], body["data"]);
    assert_eq!(row["data"]["date"], "2025-03-14");
    assert_eq!(row["data"]["steps"], 1000);
    assert_eq!(row["data"]["heart_rate_avg"], 70.0);
    assert_eq!(row["data"]["sleep_hours"], 7.0);
    assert_eq!(row["data"]["active_calories"], 200.5);
    assert_eq!(row["data"]["distance_km"], 4.0);
}

#[tokio::test]
async fn refresh_without_authorization_is_a_conflict() {
    let t = spawn_test_app();
    let user = Uuid::new_v4();

    let resp = request(
        &t.app,
        Method::POST,
        &format!("/api/users/{user}/aggregates/2025-03-14/refresh"),
        None,
    )
    .await;
    let (status, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_json_error(&body, "SOURCE_UNAVAILABLE");

    let missing = request(
        &t.app,
        Method::GET,
        &format!("/api/users/{user}/aggregates/2025-03-14"),
        None,
    )
    .await;
    let (status, body) = response_json(missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "NOT_FOUND");
}

#[tokio::test]
async fn revocation_stops_tracking_and_keeps_saved_rows() {
    let t = spawn_test_app();
    let user = Uuid::new_v4();
    authorize(&t.app, user, &ALL_METRICS).await;

    let saved = request(
        &t.app,
        Method::PUT,
        &format!("/api/users/{user}/aggregates/2025-03-14"),
        Some(json!({
            "steps": 4321,
            "heart_rate_avg": 64.5,
            "sleep_hours": 6.25,
            "active_calories": 310.0,
            "distance_km": 3.2,
        })),
    )
    .await;
    assert_eq!(saved.status(), StatusCode::OK);

    let revoke = request(
        &t.app,
        Method::PUT,
        &format!("/api/users/{user}/authorization"),
        Some(json!({ "granted": false })),
    )
    .await;
    let (status, body) = response_json(revoke).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tracked"], false);
    assert_eq!(body["data"]["authorization"]["granted"], false);
    assert!(t.store.list_tracked_users().unwrap().is_empty());

    let refresh = request(
        &t.app,
        Method::POST,
        &format!("/api/users/{user}/aggregates/2025-03-14/refresh"),
        None,
    )
    .await;
    assert_eq!(refresh.status(), StatusCode::CONFLICT);

    let fetched = request(
        &t.app,
        Method::GET,
        &format!("/api/users/{user}/aggregates/2025-03-14"),
        None,
    )
    .await;
    let (status, row) = response_json(fetched).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["data"]["steps"], 4321);

    let untrack_again = request(
        &t.app,
        Method::DELETE,
        &format!("/api/users/{user}/tracking"),
        None,
    )
    .await;
    assert_eq!(untrack_again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    let t = spawn_test_app();
    let user = Uuid::new_v4();

    let missing_field = request(
        &t.app,
        Method::POST,
        &format!("/api/users/{user}/samples"),
        Some(json!({ "metric": "step_count" })),
    )
    .await;
    let (status, body) = response_json(missing_field).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_REQUEST_BODY");

    let unknown_metric = request(
        &t.app,
        Method::POST,
        &format!("/api/users/{user}/samples"),
        Some(json!({ "metric": "blood_pressure", "samples": [] })),
    )
    .await;
    assert_eq!(unknown_metric.status(), StatusCode::BAD_REQUEST);

    let sleep_as_points = request(
        &t.app,
        Method::POST,
        &format!("/api/users/{user}/samples"),
        Some(json!({
            "metric": "sleep_analysis",
            "samples": [{ "timestamp": at(6, 0), "value": 1.0 }],
        })),
    )
    .await;
    let (status, body) = response_json(sleep_as_points).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "VALIDATION_ERROR");

    let bad_user = request(
        &t.app,
        Method::GET,
        "/api/users/not-a-user/aggregates/2025-03-14",
        None,
    )
    .await;
    let (status, body) = response_json(bad_user).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_USER_ID");
}

#[tokio::test]
async fn pre_epoch_samples_are_rejected() {
    let t = spawn_test_app();
    let user = Uuid::new_v4();

    let resp = request(
        &t.app,
        Method::POST,
        &format!("/api/users/{user}/samples"),
        Some(json!({
            "metric": "step_count",
            "samples": [
                { "timestamp": "2025-03-14T08:00:00Z", "value": 10.0 },
                { "timestamp": "1969-12-31T23:00:00Z", "value": 20.0 },
            ],
        })),
    )
    .await;
    let (status, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "VALIDATION_ERROR");
    assert!(t.store.quantity_samples.is_empty());
}

#[tokio::test]
async fn manual_save_validates_values() {
    let t = spawn_test_app();
    let user = Uuid::new_v4();

    let resp = request(
        &t.app,
        Method::PUT,
        &format!("/api/users/{user}/aggregates/2025-03-14"),
        Some(json!({
            "steps": 10,
            "heart_rate_avg": -1.0,
            "sleep_hours": 0.0,
            "active_calories": 0.0,
            "distance_km": 0.0,
        })),
    )
    .await;
    let (status, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_RECORD");
    assert!(t.store.daily_aggregates.is_empty());
}

#[tokio::test]
async fn future_days_cannot_be_refreshed() {
    let t = spawn_test_app();
    let user = Uuid::new_v4();
    authorize(&t.app, user, &ALL_METRICS).await;

    let resp = request(
        &t.app,
        Method::POST,
        &format!("/api/users/{user}/aggregates/2999-01-01/refresh"),
        None,
    )
    .await;
    let (status, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "DATE_IN_FUTURE");
}

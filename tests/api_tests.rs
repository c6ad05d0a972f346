mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use bet_dispatch::handlers;
use chrono::Duration;
use common::{harness, Harness, MORNING_SLOT};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn urgent_draft() -> Value {
    json!({
        "client_id": "client-42",
        "description": "Burst pipe under the sink",
        "address": "1200 boul. René-Lévesque, Montréal",
        "urgency": "URGENT",
        "deposit_amount": 7500
    })
}

fn bid_body(plumber_id: &str, amount: i64, eta: i32) -> Value {
    json!({
        "plumber_id": plumber_id,
        "bid_amount": amount,
        "selected_time_slot": MORNING_SLOT,
        "distance_km": 6.5,
        "eta_minutes": eta
    })
}

async fn open_urgent_job(app: &Router) -> String {
    let (status, job) = call(app, Method::POST, "/jobs", Some(urgent_draft())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(job["status"], "pending_review");
    let job_id = job["id"].as_str().unwrap().to_string();

    let (status, job) = call(
        app,
        Method::POST,
        &format!("/jobs/{job_id}/approve"),
        Some(json!({ "admin_id": "admin-7" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "in_bet");
    job_id
}

fn app_for(h: &Harness) -> Router {
    handlers::router(h.engine.clone())
}

#[tokio::test]
async fn health_reports_ok() {
    let h = harness();
    let (status, body) = call(&app_for(&h), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn urgent_job_full_flow() {
    let h = harness();
    let app = app_for(&h);
    let job_id = open_urgent_job(&app).await;

    let (status, bid) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/bids"),
        Some(bid_body("plumber-a", 240_00, 40)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bid["status"], "submitted");
    // Slots do not apply to urgent dispatch.
    assert_eq!(bid["selected_time_slot"], Value::Null);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/bids"),
        Some(bid_body("plumber-b", 210_00, 25)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, ranked) = call(
        &app,
        Method::GET,
        &format!("/jobs/{job_id}/bids/ranked"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ranked = ranked.as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["plumber_id"], "plumber-b");

    let bid_id = bid["id"].as_str().unwrap();
    let (status, job) = call(&app, Method::POST, &format!("/bids/{bid_id}/accept"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "awarded");
    assert_eq!(job["winner_id"], "plumber-a");
    assert_eq!(job["winning_amount"], 240_00);

    let (status, bids) = call(&app, Method::GET, &format!("/jobs/{job_id}/bids"), None).await;
    assert_eq!(status, StatusCode::OK);
    let statuses: Vec<&str> = bids
        .as_array()
        .unwrap()
        .iter()
        .map(|bid| bid["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["accepted", "rejected"]);
}

#[tokio::test]
async fn errors_carry_codes_and_statuses() {
    let h = harness();
    let app = app_for(&h);
    let job_id = open_urgent_job(&app).await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/bids"),
        Some(bid_body("plumber-slow", 200_00, 75)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NOT_ELIGIBLE");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/bids"),
        Some(bid_body("plumber-a", 0, 20)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/approve"),
        Some(json!({ "admin_id": "admin-7" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");

    let missing = uuid::Uuid::new_v4();
    let (status, body) = call(&app, Method::GET, &format!("/jobs/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "JOB_NOT_FOUND");

    let (status, body) = call(&app, Method::DELETE, &format!("/bids/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "BID_NOT_FOUND");

    h.clock.advance(Duration::minutes(5));
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/bids"),
        Some(bid_body("plumber-late", 200_00, 10)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "JOB_NOT_ACTIVE");

    let (_, job) = call(&app, Method::GET, &format!("/jobs/{job_id}"), None).await;
    assert_eq!(job["status"], "expired");
    assert_eq!(job["winner_id"], Value::Null);
}

#[tokio::test]
async fn rejection_requires_reason() {
    let h = harness();
    let app = app_for(&h);
    let (_, job) = call(&app, Method::POST, "/jobs", Some(urgent_draft())).await;
    let job_id = job["id"].as_str().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/reject"),
        Some(json!({ "admin_id": "admin-7", "reason": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");

    let (status, job) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/reject"),
        Some(json!({ "admin_id": "admin-7", "reason": "Outside service area" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "cancelled");
    assert_eq!(job["rejection_reason"], "Outside service area");
}

#[tokio::test]
async fn malformed_requests_get_validation_code() {
    let h = harness();
    let app = app_for(&h);
    let (_, job) = call(&app, Method::POST, "/jobs", Some(urgent_draft())).await;
    let job_id = job["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/reject"),
        Some(json!({ "admin_id": "admin-7" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");
    assert!(body["error"].as_str().unwrap().contains("reason"));

    let (_, job) = call(&app, Method::GET, &format!("/jobs/{job_id}"), None).await;
    assert_eq!(job["status"], "pending_review");

    call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/approve"),
        Some(json!({ "admin_id": "admin-7" })),
    )
    .await;
    let mut fractional = bid_body("plumber-a", 100_00, 20);
    fractional["bid_amount"] = json!(99.5);
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/bids"),
        Some(fractional),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");

    let (status, body) = call(&app, Method::GET, "/jobs/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/close"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
async fn withdraw_and_close_over_http() {
    let h = harness();
    let app = app_for(&h);
    let job_id = open_urgent_job(&app).await;

    let (_, bid) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/bids"),
        Some(bid_body("plumber-a", 180_00, 30)),
    )
    .await;
    let bid_id = bid["id"].as_str().unwrap();

    let (status, bid) = call(&app, Method::DELETE, &format!("/bids/{bid_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bid["status"], "withdrawn");

    let (status, job) = call(
        &app,
        Method::POST,
        &format!("/jobs/{job_id}/close"),
        Some(json!({ "admin_id": "admin-7" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "expired");
}

#[tokio::test]
async fn deposit_updates_follow_payment_states() {
    let h = harness();
    let app = app_for(&h);
    let (_, job) = call(&app, Method::POST, "/jobs", Some(urgent_draft())).await;
    let job_id = job["id"].as_str().unwrap();
    assert_eq!(job["deposit_status"], "pending");

    let (status, job) = call(
        &app,
        Method::PUT,
        &format!("/jobs/{job_id}/deposit"),
        Some(json!({ "status": "authorized" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["deposit_status"], "authorized");

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/jobs/{job_id}/deposit"),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");
}

#[tokio::test]
async fn policy_lists_penalties_and_windows() {
    let h = harness();
    let (status, policy) = call(&app_for(&h), Method::GET, "/policy/penalties", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(policy["auto_award_on_expiry"], false);

    let bidding = policy["bidding"].as_array().unwrap();
    assert_eq!(bidding.len(), 3);
    assert_eq!(bidding[0]["urgency"], "URGENT");
    assert_eq!(bidding[0]["window_minutes"], 5);
    assert_eq!(bidding[1]["window_minutes"], 120);
    assert_eq!(bidding[2]["window_minutes"], 1440);
}

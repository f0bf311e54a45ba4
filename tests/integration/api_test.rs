//! Integration tests for the HTTP API.

mod helpers;

use axum::http::StatusCode;
use serde_json::{Value, json};

use reminder_core::types::JobId;
use reminder_entity::job::JobState;
use reminder_worker::ScheduleStore;

use helpers::{Auth, TestApp};

fn event_body(time: &str) -> Value {
    json!({
        "name": "Design review",
        "venue": "Room 4",
        "duration": "45",
        "shouldNotify": true,
        "eventDate": "2025-03-10",
        "eventTime": time,
    })
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();
    let response = app
        .request("POST", "/api/events", Some(event_body("09:00")), Auth::None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");
    assert_eq!(response.body["message"], "No token found");
}

#[tokio::test]
async fn test_forged_token_is_unauthorized() {
    let app = TestApp::new();
    let response = app
        .request("GET", "/api/events", None, Auth::Bearer("not.a.jwt"))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid token");
}

#[tokio::test]
async fn test_create_event_schedules_reminder() {
    let app = TestApp::new();
    let token = TestApp::token_for(&TestApp::user("ada@example.com"));

    let response = app
        .request("POST", "/api/events", Some(event_body("09:00")), Auth::Cookie(&token))
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["status"], "success");
    assert_eq!(response.body["event"]["name"], "Design review");
    assert_eq!(response.body["event"]["duration"], 45);
    assert_eq!(response.body["event"]["notifyBeforeMinutes"], 30);
    assert_eq!(response.body["reminder"]["state"], "scheduled");

    let job_id: JobId = response.body["reminder"]["jobId"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    let job = app.jobs.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Pending);
    assert_eq!(job.recipient_email, "ada@example.com");
    assert_eq!(job.max_attempts, 3);
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    let app = TestApp::new();
    let token = TestApp::token_for(&TestApp::user("ada@example.com"));

    let response = app
        .request("POST", "/api/events", Some(event_body("09:00")), Auth::Bearer(&token))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_past_event_is_created_without_reminder() {
    let app = TestApp::new();
    let token = TestApp::token_for(&TestApp::user("ada@example.com"));

    let response = app
        .request("POST", "/api/events", Some(event_body("08:10")), Auth::Cookie(&token))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["reminder"], json!({ "state": "skipped" }));
    assert_eq!(app.jobs.stats().await.unwrap().total(), 0);
}

#[tokio::test]
async fn test_invalid_body_is_rejected() {
    let app = TestApp::new();
    let token = TestApp::token_for(&TestApp::user("ada@example.com"));

    let mut body = event_body("09:00");
    body.as_object_mut().unwrap().remove("shouldNotify");
    let response = app
        .request("POST", "/api/events", Some(body), Auth::Cookie(&token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Missing or invalid required fields");

    let mut body = event_body("09:00");
    body["eventDate"] = json!("10/03/2025");
    let response = app
        .request("POST", "/api/events", Some(body), Auth::Cookie(&token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unreachable_store_fails_without_writing_event() {
    let app = TestApp::new();
    let token = TestApp::token_for(&TestApp::user("ada@example.com"));

    app.jobs.set_offline(true);
    let response = app
        .request("POST", "/api/events", Some(event_body("09:00")), Auth::Cookie(&token))
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error"], "SERVICE_UNAVAILABLE");

    app.jobs.set_offline(false);
    let response = app
        .request("GET", "/api/events", None, Auth::Cookie(&token))
        .await;
    assert_eq!(response.body, json!([]));
}

#[tokio::test]
async fn test_list_returns_only_callers_events_in_order() {
    let app = TestApp::new();
    let ada = TestApp::token_for(&TestApp::user("ada@example.com"));
    let bob = TestApp::token_for(&TestApp::user("bob@example.com"));

    for time in ["17:00", "09:00"] {
        app.request("POST", "/api/events", Some(event_body(time)), Auth::Cookie(&ada))
            .await;
    }
    app.request("POST", "/api/events", Some(event_body("12:00")), Auth::Cookie(&bob))
        .await;

    let response = app
        .request("GET", "/api/events", None, Auth::Cookie(&ada))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let times: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["eventTime"].as_str().unwrap())
        .collect();
    assert_eq!(times, ["09:00:00", "17:00:00"]);
}

#[tokio::test]
async fn test_delete_cancels_reminder_and_checks_owner() {
    let app = TestApp::new();
    let ada = TestApp::token_for(&TestApp::user("ada@example.com"));
    let bob = TestApp::token_for(&TestApp::user("bob@example.com"));

    let created = app
        .request("POST", "/api/events", Some(event_body("09:00")), Auth::Cookie(&ada))
        .await;
    let event_id = created.body["event"]["id"].as_str().unwrap().to_string();
    let job_id: JobId = created.body["reminder"]["jobId"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    let path = format!("/api/events/{event_id}");

    let response = app.request("DELETE", &path, None, Auth::Cookie(&bob)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Event not found or unauthorized");

    let response = app.request("DELETE", &path, None, Auth::Cookie(&ada)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "success": true }));

    let job = app.jobs.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Cancelled);

    let response = app.request("DELETE", &path, None, Auth::Cookie(&ada)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_queue_depth() {
    let app = TestApp::new();
    let token = TestApp::token_for(&TestApp::user("ada@example.com"));
    app.request("POST", "/api/events", Some(event_body("09:00")), Auth::Cookie(&token))
        .await;

    let response = app.request("GET", "/api/health", None, Auth::None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["queue"]["pending"], 1);

    app.jobs.set_offline(true);
    let response = app.request("GET", "/api/health", None, Auth::None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.get("queue").is_none());
}

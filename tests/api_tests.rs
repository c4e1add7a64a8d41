//! HTTP control surface tests

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use avatar_call_guard::{
    coordinator::NoopObserver, create_router, spawn_coordinator, AppState, TimeOptions,
};

fn app() -> Router {
    let (coordinator, _task) = spawn_coordinator(TimeOptions::default(), Arc::new(NoopObserver));
    create_router(Arc::new(AppState::new(coordinator, 20554, "127.0.0.1".to_string())))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn status_starts_idle() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call"]["status"], "idle");
    assert_eq!(body["port"], 20554);
    assert!(body["last_action"].is_null());
}

#[tokio::test]
async fn call_lifecycle_over_http() {
    let app = app();

    let (status, body) = post(&app, "/call/start", json!({"mode": "audio", "durationBalanceSec": 240})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call"]["status"], "connecting");
    assert_eq!(body["call"]["mode"], "audio");
    assert_eq!(body["call"]["countdownDisplay"], "04:00");

    let (status, _) = post(&app, "/call/start", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = post(&app, "/engine/events", json!({"event": "show", "sessionId": "s-9"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call"]["status"], "connected");
    assert_eq!(body["call"]["sessionId"], "s-9");

    let (status, body) = post(&app, "/engine/events", json!({"event": "asrStop"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call"]["waitingAnswer"], true);

    let (status, body) = send(&app, Method::POST, "/call/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call"]["status"], "stopped");
    assert_eq!(body["call"]["lastReason"], "stopCall");

    // a slow engine coming up after the hang-up is shut down again
    let (_, body) = post(&app, "/engine/events", json!({"event": "show"})).await;
    assert_eq!(body["call"]["lastReason"], "stopMarker");

    let (_, body) = send(&app, Method::GET, "/status", None).await;
    assert_eq!(body["last_action"], "show");
}

#[tokio::test]
async fn stop_accepts_explicit_reason() {
    let app = app();
    post(&app, "/call/start", json!({})).await;

    let (status, body) = post(&app, "/call/stop", json!({"reason": "cancelCall"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call"]["lastReason"], "cancelCall");
}

#[tokio::test]
async fn restart_without_previous_call_is_rejected() {
    let app = app();
    let (status, body) = send(&app, Method::POST, "/call/restart", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn grace_needs_a_connected_call() {
    let app = app();
    post(&app, "/call/start", json!({})).await;

    let (status, _) = post(&app, "/call/grace", json!({"ext": "bye-1"})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    post(&app, "/engine/events", json!({"event": "show"})).await;
    let (status, body) = post(&app, "/call/grace", json!({"ext": "bye-1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call"]["status"], "connected");
}

#[tokio::test]
async fn start_failure_stops_the_call() {
    let app = app();
    post(&app, "/call/start", json!({})).await;

    let (status, body) = post(&app, "/call/start-failed", json!({"message": "init failed"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call"]["status"], "stopped");
    assert!(body["call"]["stoppedAt"].is_null());
}

#[tokio::test]
async fn unknown_engine_event_is_rejected() {
    let app = app();
    let (status, _) = post(&app, "/engine/events", json!({"event": "dance"})).await;

    assert!(status.is_client_error());
}

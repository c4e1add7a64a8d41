//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/call/start", post(start_handler))
        .route("/call/restart", post(restart_handler))
        .route("/call/stop", post(stop_handler))
        .route("/call/start-failed", post(start_failed_handler))
        .route("/call/balance", post(balance_handler))
        .route("/call/grace", post(grace_handler))
        .route("/call/typing", post(typing_handler))
        .route("/call/text", post(text_handler))
        .route("/engine/events", post(engine_event_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

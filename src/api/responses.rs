//! API response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{error::CallError, state::SessionSnapshot};

/// API response structure for call commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub call: Option<SessionSnapshot>,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: &str, message: String, call: Option<SessionSnapshot>) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            call,
        }
    }

    /// Create a success response carrying the resulting call state
    pub fn ok(message: impl Into<String>, call: SessionSnapshot) -> Self {
        Self::new("ok", message.into(), Some(call))
    }

    /// Create an error response
    pub fn error(message: String) -> Self {
        Self::new("error", message, None)
    }
}

/// Status response with the current call and server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub call: SessionSnapshot,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl IntoResponse for CallError {
    fn into_response(self) -> Response {
        let status = match self {
            CallError::CallInProgress(_) | CallError::NotConnected(_) => StatusCode::CONFLICT,
            CallError::NothingToRestart => StatusCode::BAD_REQUEST,
            CallError::CoordinatorClosed => StatusCode::SERVICE_UNAVAILABLE,
        };
        warn!("Call command failed: {}", self);

        (status, Json(ApiResponse::error(self.to_string()))).into_response()
    }
}

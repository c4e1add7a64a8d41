//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{extract::State, response::Json};
use serde::Deserialize;
use tracing::info;

use crate::{
    engine::EngineEvent,
    error::CallError,
    state::{AppState, Reason, StartOptions},
    tasks::Command,
};
use super::responses::{ApiResponse, HealthResponse, StatusResponse};

type ApiResult = Result<Json<ApiResponse>, CallError>;

/// Body of POST /call/stop
#[derive(Debug, Default, Deserialize)]
pub struct StopRequest {
    pub reason: Option<Reason>,
}

/// Body of POST /call/balance
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRequest {
    pub duration_balance_sec: u64,
}

/// Body of POST /call/grace
#[derive(Debug, Deserialize)]
pub struct GraceRequest {
    pub ext: String,
}

/// Body of POST /call/start-failed
#[derive(Debug, Deserialize)]
pub struct StartFailedRequest {
    pub message: String,
}

async fn run(state: &AppState, action: &str, command: Command, message: &str) -> ApiResult {
    let call = state.coordinator.request(command).await?;
    state.record_action(action);
    Ok(Json(ApiResponse::ok(message, call)))
}

/// Handle POST /call/start - Start a new call
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Json(options): Json<StartOptions>,
) -> ApiResult {
    info!("Start endpoint called ({:?} mode)", options.mode);
    run(&state, "start", Command::Start(options), "Call starting").await
}

/// Handle POST /call/restart - Start again with the previous options
pub async fn restart_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    info!("Restart endpoint called");
    run(&state, "restart", Command::Restart, "Call restarting").await
}

/// Handle POST /call/stop - Hang up
pub async fn stop_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StopRequest>>,
) -> ApiResult {
    let reason = body.and_then(|Json(request)| request.reason).unwrap_or(Reason::Stop);
    info!("Stop endpoint called: {}", reason);
    run(&state, reason.as_str(), Command::Stop(Some(reason)), "Call stopped").await
}

/// Handle POST /call/start-failed - Engine init or start failed on the page
pub async fn start_failed_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartFailedRequest>,
) -> ApiResult {
    info!("Start-failed endpoint called: {}", request.message);
    run(&state, "start-failed", Command::StartFailed(request.message), "Start failure recorded").await
}

/// Handle POST /call/balance - New account balance
pub async fn balance_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BalanceRequest>,
) -> ApiResult {
    run(
        &state,
        "balance",
        Command::UpdateBalance(request.duration_balance_sec),
        "Balance updated",
    )
    .await
}

/// Handle POST /call/grace - Farewell utterance started, begin grace period
pub async fn grace_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GraceRequest>,
) -> ApiResult {
    run(&state, "grace", Command::BeginStopGrace(request.ext), "Stop grace period started").await
}

/// Handle POST /call/typing - User is typing
pub async fn typing_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    run(&state, "typing", Command::Typing, "Typing noted").await
}

/// Handle POST /call/text - User sent typed text
pub async fn text_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    run(&state, "text", Command::TextSent, "Text noted").await
}

/// Handle POST /engine/events - Forward an avatar engine event
pub async fn engine_event_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<EngineEvent>,
) -> ApiResult {
    let kind = event.kind().as_str();
    run(&state, kind, Command::Engine(event), "Engine event handled").await
}

/// Handle GET /status - Return current call status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        call: state.coordinator.snapshot(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

//! Avatar Call Guard - HTTP host for the call lifecycle coordinator
//!
//! This is the main entry point for the avatar-call-guard application.

use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, time::timeout};
use tracing::{info, warn};

use avatar_call_guard::{
    api::create_router,
    config::Config,
    coordinator::{Command, LoggingObserver},
    state::AppState,
    tasks::spawn_coordinator,
    utils::shutdown_signal,
};

/// How long shutdown waits for the coordinator task to finish
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "avatar_call_guard={},tower_http=info",
            config.log_level()
        ))
        .init();

    let defaults = config.default_time_options();
    info!("Starting avatar-call-guard v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, defaults={:?}",
        config.host, config.port, defaults
    );

    // Start the coordinator task
    let (coordinator, coordinator_task) = spawn_coordinator(defaults, Arc::new(LoggingObserver));
    let state = Arc::new(AppState::new(coordinator.clone(), config.port, config.host.clone()));

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /call/start      - Start a call");
    info!("  POST /call/stop       - Hang up");
    info!("  POST /engine/events   - Forward an avatar engine event");
    info!("  GET  /status          - Current call state");
    info!("  GET  /health          - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // open connections still hold handles, so unmount instead of waiting
    // for the last one to go
    if let Err(e) = coordinator.request(Command::Unmount).await {
        warn!("Failed to unmount call: {}", e);
    }
    drop(coordinator);
    match timeout(SHUTDOWN_TIMEOUT, coordinator_task).await {
        Ok(result) => result?,
        Err(_) => warn!("Coordinator task still referenced by open connections"),
    }

    info!("Server shutdown complete");
    Ok(())
}

//! Shared state of the HTTP control surface

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::{tasks::CoordinatorHandle, utils::format_uptime};

/// State shared by all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle to the call coordinator task
    pub coordinator: CoordinatorHandle,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<(String, DateTime<Utc>)>>>,
}

impl AppState {
    pub fn new(coordinator: CoordinatorHandle, port: u16, host: String) -> Self {
        Self {
            coordinator,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
        }
    }

    /// Remember the most recent action taken through the API
    pub fn record_action(&self, action: &str) {
        match self.last_action.lock() {
            Ok(mut last_action) => *last_action = Some((action.to_string(), Utc::now())),
            Err(e) => warn!("Failed to record last action: {}", e),
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        self.last_action
            .lock()
            .ok()
            .and_then(|last| last.clone())
            .map_or((None, None), |(action, time)| (Some(action), Some(time)))
    }

    /// Server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        format_uptime(self.start_time.elapsed())
    }
}

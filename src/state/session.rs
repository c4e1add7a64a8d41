//! Call session state owned by the coordinator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CallMode, Reason, TimeOptions};
use crate::utils::format_countdown;

/// Balance at or below which the countdown is shown to the user
pub const COUNTDOWN_VISIBLE_SEC: i64 = 60 * 5;

/// Connection status of the current call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// No call has been started yet
    #[default]
    Idle,
    Connecting,
    Connected,
    Stopped,
}

impl CallStatus {
    /// A new call may only be started from these statuses
    pub fn can_start(&self) -> bool {
        matches!(self, CallStatus::Idle | CallStatus::Stopped)
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallStatus::Idle => write!(f, "idle"),
            CallStatus::Connecting => write!(f, "connecting"),
            CallStatus::Connected => write!(f, "connected"),
            CallStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Mutable state of the current (or last) call
#[derive(Debug, Clone, Default)]
pub struct CallSession {
    pub status: CallStatus,
    pub mode: CallMode,
    /// Set once when the call is explicitly stopped, cleared on the next start
    pub stop_marker: Option<DateTime<Utc>>,
    /// Incremented on every start; tags timer messages
    pub call_id: u64,
    pub options: TimeOptions,
    pub session_id: Option<String>,
    /// Live balance as reported by the countdown
    pub balance_sec: i64,
    pub waiting_answer: bool,
    pub inputting: bool,
    pub last_reason: Option<Reason>,
    pub started_at: Option<DateTime<Utc>>,
}

impl CallSession {
    /// Reset per-call fields for a fresh attempt
    pub fn begin(&mut self, mode: CallMode, options: TimeOptions) {
        self.call_id += 1;
        self.status = CallStatus::Connecting;
        self.mode = mode;
        self.stop_marker = None;
        self.balance_sec = options.balance_sec();
        self.options = options;
        self.session_id = None;
        self.last_reason = None;
        self.started_at = Some(Utc::now());
        self.clear_conversation_flags();
    }

    /// Record an explicit stop
    pub fn mark_stopped(&mut self, reason: Option<Reason>) {
        self.stop_marker = Some(Utc::now());
        self.status = CallStatus::Stopped;
        if reason.is_some() {
            self.last_reason = reason;
        }
        self.clear_conversation_flags();
    }

    pub fn clear_conversation_flags(&mut self) {
        self.waiting_answer = false;
        self.inputting = false;
    }

    pub fn is_stopped(&self) -> bool {
        self.status == CallStatus::Stopped
    }

    /// Build the externally visible snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        let countdown_display = if self.balance_sec <= COUNTDOWN_VISIBLE_SEC {
            format_countdown(self.balance_sec)
        } else {
            String::new()
        };

        SessionSnapshot {
            status: self.status,
            mode: self.mode,
            call_id: self.call_id,
            stopped_at: self.stop_marker,
            session_id: self.session_id.clone(),
            balance_sec: self.balance_sec,
            countdown_display,
            waiting_answer: self.waiting_answer,
            inputting: self.inputting,
            last_reason: self.last_reason,
            started_at: self.started_at,
        }
    }
}

/// Serializable view of a call session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: CallStatus,
    pub mode: CallMode,
    pub call_id: u64,
    pub stopped_at: Option<DateTime<Utc>>,
    pub session_id: Option<String>,
    pub balance_sec: i64,
    pub countdown_display: String,
    pub waiting_answer: bool,
    pub inputting: bool,
    pub last_reason: Option<Reason>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        CallSession::default().snapshot()
    }
}

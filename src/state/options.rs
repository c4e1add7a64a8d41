//! Per-call time options

use serde::{Deserialize, Serialize};

/// Default inactivity window in seconds
pub const DEFAULT_ACTIVE_CHECK_SEC: u64 = 60 * 5;
/// Default stop-call grace period in seconds
pub const DEFAULT_STOP_CALL_TIME_SEC: u64 = 15;

/// Media mode of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    Audio,
    #[default]
    Video,
}

/// Durations that govern the call timers, all in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOptions {
    pub active_check_sec: u64,
    pub session_time_out_sec: u64,
    pub duration_balance_sec: u64,
    pub taster: bool,
    pub taster_sec: u64,
    pub stop_call_time_sec: u64,
}

impl Default for TimeOptions {
    fn default() -> Self {
        Self {
            active_check_sec: DEFAULT_ACTIVE_CHECK_SEC,
            session_time_out_sec: 0,
            duration_balance_sec: 0,
            taster: false,
            taster_sec: 0,
            stop_call_time_sec: DEFAULT_STOP_CALL_TIME_SEC,
        }
    }
}

impl TimeOptions {
    /// Whether the trial ceiling applies to this call
    pub fn taster_enabled(&self) -> bool {
        self.taster && self.taster_sec > 0
    }

    /// The balance as a signed countdown value, saturating at `i64::MAX`
    pub fn balance_sec(&self) -> i64 {
        i64::try_from(self.duration_balance_sec).unwrap_or(i64::MAX)
    }
}

/// Partially specified options as sent with a start request
///
/// Fields left out fall back to the server defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOptions {
    #[serde(default)]
    pub mode: CallMode,
    pub active_check_sec: Option<u64>,
    pub session_time_out_sec: Option<u64>,
    pub duration_balance_sec: Option<u64>,
    pub taster: Option<bool>,
    pub taster_sec: Option<u64>,
    pub stop_call_time_sec: Option<u64>,
}

impl StartOptions {
    /// Resolve against the given defaults
    pub fn resolve(&self, defaults: &TimeOptions) -> TimeOptions {
        TimeOptions {
            active_check_sec: self.active_check_sec.unwrap_or(defaults.active_check_sec),
            session_time_out_sec: self
                .session_time_out_sec
                .unwrap_or(defaults.session_time_out_sec),
            duration_balance_sec: self
                .duration_balance_sec
                .unwrap_or(defaults.duration_balance_sec),
            taster: self.taster.unwrap_or(defaults.taster),
            taster_sec: self.taster_sec.unwrap_or(defaults.taster_sec),
            stop_call_time_sec: self.stop_call_time_sec.unwrap_or(defaults.stop_call_time_sec),
        }
    }
}

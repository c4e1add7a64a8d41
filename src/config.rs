//! Configuration and CLI argument handling

use clap::Parser;

use crate::state::{
    options::{DEFAULT_ACTIVE_CHECK_SEC, DEFAULT_STOP_CALL_TIME_SEC},
    TimeOptions,
};

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "avatar-call-guard")]
#[command(about = "Call lifecycle timer coordinator for a digital-avatar chat box")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value_t = 20554)]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Default inactivity window in seconds
    #[arg(long, default_value_t = DEFAULT_ACTIVE_CHECK_SEC)]
    pub active_check_sec: u64,

    /// Default stop-call grace period in seconds
    #[arg(long, default_value_t = DEFAULT_STOP_CALL_TIME_SEC)]
    pub stop_call_time_sec: u64,

    /// Default session limit in seconds (0 disables it)
    #[arg(long, default_value_t = 0)]
    pub session_timeout_sec: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Time options used for fields a start request leaves out
    pub fn default_time_options(&self) -> TimeOptions {
        TimeOptions {
            active_check_sec: self.active_check_sec,
            session_time_out_sec: self.session_timeout_sec,
            stop_call_time_sec: self.stop_call_time_sec,
            ..TimeOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_widget_defaults() {
        let config = Config::try_parse_from(["avatar-call-guard"]).unwrap();
        let options = config.default_time_options();

        assert_eq!(config.address(), "0.0.0.0:20554");
        assert_eq!(config.log_level(), "info");
        assert_eq!(options, TimeOptions::default());
    }

    #[test]
    fn time_flags_override_defaults() {
        let config = Config::try_parse_from([
            "avatar-call-guard",
            "--active-check-sec",
            "120",
            "--session-timeout-sec",
            "900",
            "-v",
        ])
        .unwrap();
        let options = config.default_time_options();

        assert_eq!(options.active_check_sec, 120);
        assert_eq!(options.session_time_out_sec, 900);
        assert_eq!(config.log_level(), "debug");
    }
}

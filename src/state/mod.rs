//! State management module
//!
//! This module contains the call session state, its options, the reason
//! codes reported when a call ends, and the state shared by HTTP handlers.

pub mod app_state;
pub mod options;
pub mod reason;
pub mod session;

// Re-export main types
pub use app_state::AppState;
pub use options::{CallMode, StartOptions, TimeOptions};
pub use reason::{CallAction, Reason};
pub use session::{CallSession, CallStatus, SessionSnapshot};

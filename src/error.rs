//! Errors returned by call commands

use std::fmt;

use crate::state::CallStatus;

/// Why a call command was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// A call is already connecting or connected
    CallInProgress(CallStatus),
    /// Restart was requested before any call was started
    NothingToRestart,
    /// The command needs a connected call
    NotConnected(CallStatus),
    /// The coordinator task has shut down
    CoordinatorClosed,
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::CallInProgress(status) => write!(f, "A call is already {status}"),
            CallError::NothingToRestart => write!(f, "No previous call to restart"),
            CallError::NotConnected(status) => write!(f, "Call is not connected (status: {status})"),
            CallError::CoordinatorClosed => write!(f, "Call coordinator is not running"),
        }
    }
}

impl std::error::Error for CallError {}

pub type CallResult<T> = Result<T, CallError>;

//! Background tasks module
//!
//! This module contains the coordinator task that runs alongside the HTTP server.

pub mod coordinator_task;

// Re-export main types
pub use crate::coordinator::Command;
pub use coordinator_task::{spawn_coordinator, CoordinatorHandle, WeakCoordinatorHandle};

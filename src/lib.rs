//! Avatar Call Guard - call lifecycle timers for a digital-avatar chat box
//!
//! This library decides when an avatar call must end: it runs the
//! inactivity, session, balance, trial and grace timers of a call and
//! reacts to avatar engine events, reporting a single termination reason
//! to the host application.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod state;
pub mod tasks;
pub mod timers;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use coordinator::{CallNotice, CallObserver, Command, LifecycleCoordinator};
pub use engine::{bind_engine, AvatarEngine, EngineEvent, EventEmitter};
pub use error::{CallError, CallResult};
pub use state::{AppState, CallStatus, Reason, SessionSnapshot, StartOptions, TimeOptions};
pub use tasks::{spawn_coordinator, CoordinatorHandle, WeakCoordinatorHandle};
pub use utils::signals::shutdown_signal;

//! Avatar engine boundary
//!
//! The engine itself is external; all the coordinator needs is a way to
//! subscribe to its events. Anything that can register a handler per event
//! kind can drive a call.

pub mod emitter;
pub mod events;

use std::sync::Arc;
use tracing::warn;

use crate::tasks::{CoordinatorHandle, Command};

// Re-export main types
pub use emitter::EventEmitter;
pub use events::{EngineEvent, EngineEventKind};

/// Handler invoked with each event of a subscribed kind
pub type EventHandler = Arc<dyn Fn(EngineEvent) + Send + Sync>;

/// Capability the avatar engine must provide
pub trait AvatarEngine: Send + Sync {
    /// Register `handler` for events of `kind`
    fn on(&self, kind: EngineEventKind, handler: EventHandler);
}

/// Forward every engine event the coordinator cares about to `handle`
///
/// Handlers hold a weak sender, so a bound engine does not stop the
/// coordinator from unmounting once the last handle is dropped.
pub fn bind_engine<E>(engine: &E, handle: &CoordinatorHandle)
where
    E: AvatarEngine + ?Sized,
{
    for kind in EngineEventKind::ALL {
        let handle = handle.downgrade();
        engine.on(
            kind,
            Arc::new(move |event| {
                if let Err(e) = handle.send(Command::Engine(event)) {
                    warn!("Dropping {} event: {}", kind.as_str(), e);
                }
            }),
        );
    }
}

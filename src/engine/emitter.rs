//! In-process event emitter satisfying [`AvatarEngine`]

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use super::{AvatarEngine, EngineEvent, EngineEventKind, EventHandler};

/// Dispatches emitted events to the handlers registered for their kind
#[derive(Default)]
pub struct EventEmitter {
    handlers: Mutex<HashMap<EngineEventKind, Vec<EventHandler>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every handler of its kind, returning how many ran
    pub fn emit(&self, event: EngineEvent) -> usize {
        let handlers = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();

        for handler in &handlers {
            handler(event.clone());
        }
        handlers.len()
    }

    pub fn handler_count(&self, kind: EngineEventKind) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl AvatarEngine for EventEmitter {
    fn on(&self, kind: EngineEventKind, handler: EventHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(handler);
    }
}

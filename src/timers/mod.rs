//! Call timers module
//!
//! One-shot and periodic timers backed by tokio tasks, and the fixed set of
//! them that guards a single call. Timers never touch call state; they only
//! report through callbacks.

pub mod countdown;
pub mod one_shot;
pub mod timer_set;

use std::sync::{Mutex, MutexGuard, PoisonError};

// Re-export main types
pub use countdown::PeriodicCountdown;
pub use one_shot::OneShotTimer;
pub use timer_set::{TimerKind, TimerMessage, TimerSet};

/// Lock timer state, recovering from a poisoned lock
///
/// Timer state stays consistent across a panicking callback because the
/// callbacks run after the lock is released.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

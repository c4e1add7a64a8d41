//! Restartable once-per-second countdown

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant},
};
use tracing::debug;

use super::lock;

/// Interval between two ticks
pub const TICK: Duration = Duration::from_secs(1);

/// Callback invoked with the remaining seconds after every tick
pub type TickCallback = Arc<dyn Fn(i64) + Send + Sync>;

#[derive(Debug)]
struct Countdown {
    remaining: i64,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

/// A countdown that decrements once per second while running
///
/// The value is not clamped: it keeps going below zero until stopped. The
/// receiver of the ticks decides what zero means.
pub struct PeriodicCountdown {
    name: &'static str,
    inner: Arc<Mutex<Countdown>>,
    on_tick: TickCallback,
}

impl PeriodicCountdown {
    pub fn new<F>(name: &'static str, seconds: i64, on_tick: F) -> Self
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        Self {
            name,
            inner: Arc::new(Mutex::new(Countdown {
                remaining: seconds,
                generation: 0,
                handle: None,
            })),
            on_tick: Arc::new(on_tick),
        }
    }

    /// Start ticking, cancelling any previous run
    ///
    /// `Some(seconds)` resets the remaining value; `None` resumes from the
    /// current one. The first tick happens one interval after the start.
    pub fn start(&self, seconds: Option<i64>) {
        let mut countdown = lock(&self.inner);

        if let Some(handle) = countdown.handle.take() {
            handle.abort();
        }
        countdown.generation += 1;
        if let Some(seconds) = seconds {
            countdown.remaining = seconds;
        }

        let generation = countdown.generation;
        let shared = Arc::clone(&self.inner);
        let on_tick = Arc::clone(&self.on_tick);

        debug!(timer = self.name, remaining = countdown.remaining, "Countdown started");
        countdown.handle = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            loop {
                interval.tick().await;

                let remaining = {
                    let mut countdown = lock(&shared);
                    if countdown.generation != generation {
                        return;
                    }
                    countdown.remaining -= 1;
                    countdown.remaining
                };

                on_tick(remaining);
            }
        }));
    }

    /// Stop ticking; the remaining value is kept
    pub fn stop(&self) {
        let mut countdown = lock(&self.inner);
        countdown.generation += 1;
        if let Some(handle) = countdown.handle.take() {
            handle.abort();
            debug!(timer = self.name, remaining = countdown.remaining, "Countdown stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner).handle.is_some()
    }

    pub fn remaining(&self) -> i64 {
        lock(&self.inner).remaining
    }
}

impl Drop for PeriodicCountdown {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PeriodicCountdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let countdown = lock(&self.inner);
        f.debug_struct("PeriodicCountdown")
            .field("name", &self.name)
            .field("remaining", &countdown.remaining)
            .field("running", &countdown.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{sync::mpsc, time::timeout};

    fn recording_countdown(seconds: i64) -> (PeriodicCountdown, mpsc::UnboundedReceiver<i64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let countdown = PeriodicCountdown::new("test", seconds, move |remaining| {
            let _ = tx.send(remaining);
        });
        (countdown, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_down_once_per_second() {
        let (countdown, mut rx) = recording_countdown(0);
        let started = Instant::now();
        countdown.start(Some(5));

        for expected in [4, 3, 2] {
            assert_eq!(rx.recv().await, Some(expected));
        }
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_millis(3100));
        assert_eq!(countdown.remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_counting_below_zero() {
        let (countdown, mut rx) = recording_countdown(2);
        countdown.start(None);

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(rx.recv().await.unwrap());
        }
        assert_eq!(seen, vec![1, 0, -1, -2]);
        assert!(countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticks() {
        let (countdown, mut rx) = recording_countdown(10);
        countdown.start(None);
        assert_eq!(rx.recv().await, Some(9));

        countdown.stop();
        assert!(!countdown.is_running());
        assert!(timeout(Duration::from_secs(60), rx.recv()).await.is_err());
        assert_eq!(countdown.remaining(), 9);

        countdown.stop();
        assert_eq!(countdown.remaining(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_begins_fresh_from_new_value() {
        let (countdown, mut rx) = recording_countdown(100);
        countdown.start(None);
        assert_eq!(rx.recv().await, Some(99));

        countdown.start(Some(50));
        assert_eq!(rx.recv().await, Some(49));
        assert_eq!(rx.recv().await, Some(48));
    }
}

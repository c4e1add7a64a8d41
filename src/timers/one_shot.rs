//! Restartable single-fire timer

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::task::JoinHandle;
use tracing::debug;

use super::lock;

/// Callback invoked when the timer fires, with its payload and the
/// generation of the arming that fired
pub type FireCallback<R> = Arc<dyn Fn(R, u64) + Send + Sync>;
/// Callback invoked when an armed timer is cancelled on purpose
pub type StopCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug)]
struct Arming<R> {
    minutes: f64,
    reason: R,
    /// Bumped on every start and stop; a sleeping task only fires if it
    /// still holds the current value.
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

/// A cancellable, restartable delayed callback
///
/// At most one fire is pending per instance. Starting an armed timer
/// replaces the pending fire instead of adding a second one.
pub struct OneShotTimer<R> {
    name: &'static str,
    inner: Arc<Mutex<Arming<R>>>,
    on_fire: FireCallback<R>,
    on_stop: Option<StopCallback>,
}

impl<R> OneShotTimer<R>
where
    R: Clone + Send + 'static,
{
    /// Create a disarmed timer with a duration in minutes
    pub fn new<F>(name: &'static str, minutes: f64, reason: R, on_fire: F) -> Self
    where
        F: Fn(R, u64) + Send + Sync + 'static,
    {
        Self {
            name,
            inner: Arc::new(Mutex::new(Arming {
                minutes,
                reason,
                generation: 0,
                handle: None,
            })),
            on_fire: Arc::new(on_fire),
            on_stop: None,
        }
    }

    /// Register a callback for intentional stops
    pub fn with_stop_callback<F>(mut self, on_stop: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_stop = Some(Arc::new(on_stop));
        self
    }

    /// Arm the timer, replacing any pending fire
    ///
    /// A given duration or reason replaces the stored one for this and later
    /// arms. A non-positive duration is ignored; if the stored duration is
    /// not positive either the timer stays disarmed.
    pub fn start(&self, minutes: Option<f64>, reason: Option<R>) {
        let mut arming = lock(&self.inner);

        if let Some(handle) = arming.handle.take() {
            handle.abort();
            debug!(timer = self.name, "Restarting armed timer");
        }
        arming.generation += 1;

        if let Some(minutes) = minutes.filter(|m| m.is_finite() && *m > 0.0) {
            arming.minutes = minutes;
        }
        if let Some(reason) = reason {
            arming.reason = reason;
        }

        if !(arming.minutes.is_finite() && arming.minutes > 0.0) {
            debug!(timer = self.name, "No duration configured, timer not armed");
            return;
        }

        // durations beyond what `Duration` holds sleep until tokio's far future
        let delay = Duration::try_from_secs_f64(arming.minutes * 60.0).unwrap_or(Duration::MAX);
        let generation = arming.generation;
        let shared = Arc::clone(&self.inner);
        let on_fire = Arc::clone(&self.on_fire);
        let name = self.name;

        debug!(timer = name, delay_secs = delay.as_secs_f64(), "Timer armed");
        arming.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let reason = {
                let mut arming = lock(&shared);
                if arming.generation != generation {
                    return;
                }
                arming.handle = None;
                arming.reason.clone()
            };

            debug!(timer = name, "Timer fired");
            on_fire(reason, generation);
        }));
    }

    /// Cancel the pending fire
    ///
    /// With `invoke_manual_callback` set, the stop callback runs if a fire
    /// was actually pending. Stopping a disarmed timer does nothing.
    pub fn stop(&self, invoke_manual_callback: bool) {
        let was_armed = {
            let mut arming = lock(&self.inner);
            arming.generation += 1;
            match arming.handle.take() {
                Some(handle) => {
                    handle.abort();
                    true
                }
                None => false,
            }
        };

        if !was_armed {
            return;
        }
        debug!(timer = self.name, "Timer stopped");

        if invoke_manual_callback {
            if let Some(on_stop) = &self.on_stop {
                on_stop();
            }
        }
    }

    /// Whether `generation` is still the latest arming
    ///
    /// False once the timer has been started or stopped again, so a fire
    /// that was already delivered but not yet acted on can be dropped.
    pub fn is_current(&self, generation: u64) -> bool {
        lock(&self.inner).generation == generation
    }

    /// Whether a fire is pending
    pub fn is_armed(&self) -> bool {
        lock(&self.inner).handle.is_some()
    }

    pub fn minutes(&self) -> f64 {
        lock(&self.inner).minutes
    }

    pub fn reason(&self) -> R {
        lock(&self.inner).reason.clone()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<R> Drop for OneShotTimer<R> {
    fn drop(&mut self) {
        let mut arming = lock(&self.inner);
        arming.generation += 1;
        if let Some(handle) = arming.handle.take() {
            handle.abort();
        }
    }
}

impl<R> std::fmt::Debug for OneShotTimer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let arming = lock(&self.inner);
        f.debug_struct("OneShotTimer")
            .field("name", &self.name)
            .field("minutes", &arming.minutes)
            .field("armed", &arming.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Reason;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::{
        sync::mpsc,
        time::{timeout, Instant},
    };

    fn recording_timer(minutes: f64) -> (OneShotTimer<Reason>, mpsc::UnboundedReceiver<Reason>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timer = OneShotTimer::new("test", minutes, Reason::Inactive, move |reason, _| {
            let _ = tx.send(reason);
        });
        (timer, rx)
    }

    async fn assert_silent(rx: &mut mpsc::UnboundedReceiver<Reason>) {
        assert!(timeout(Duration::from_secs(3600), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_duration() {
        let (timer, mut rx) = recording_timer(1.0);
        let started = Instant::now();
        timer.start(None, None);
        assert!(timer.is_armed());

        assert_eq!(rx.recv().await, Some(Reason::Inactive));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
        assert!(!timer.is_armed());

        assert_silent(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_schedules_a_single_fire() {
        let (timer, mut rx) = recording_timer(1.0);
        timer.start(None, None);
        timer.start(None, None);

        assert_eq!(rx.recv().await, Some(Reason::Inactive));
        assert_silent(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_elapse_prevents_fire() {
        let (timer, mut rx) = recording_timer(1.0);
        timer.start(None, None);
        tokio::time::sleep(Duration::from_secs(30)).await;
        timer.stop(true);

        assert!(!timer.is_armed());
        assert_silent(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn restart_uses_new_duration() {
        let (timer, mut rx) = recording_timer(1.0);
        timer.start(None, None);
        tokio::time::sleep(Duration::from_secs(30)).await;

        let restarted = Instant::now();
        timer.start(Some(2.0), None);
        rx.recv().await;

        let elapsed = restarted.elapsed();
        assert!(elapsed >= Duration::from_secs(120) && elapsed < Duration::from_secs(121));
        assert_eq!(timer.minutes(), 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn reason_override_is_reported() {
        let (timer, mut rx) = recording_timer(0.5);
        timer.start(None, Some(Reason::TasterTimeCheck));

        assert_eq!(rx.recv().await, Some(Reason::TasterTimeCheck));
        assert_eq!(timer.reason(), Reason::TasterTimeCheck);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_never_arms() {
        let (timer, mut rx) = recording_timer(0.0);
        timer.start(None, None);
        assert!(!timer.is_armed());

        timer.start(Some(0.0), None);
        assert!(!timer.is_armed());
        assert_silent(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn manual_callback_only_for_intentional_stops() {
        let stops = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&stops);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = OneShotTimer::new("test", 1.0, Reason::Inactive, move |reason, _| {
            let _ = tx.send(reason);
        })
        .with_stop_callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // restart is not a manual stop
        timer.start(None, None);
        timer.start(None, None);
        assert_eq!(stops.load(Ordering::SeqCst), 0);

        timer.stop(false);
        assert_eq!(stops.load(Ordering::SeqCst), 0);

        timer.start(None, None);
        timer.stop(true);
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        // natural fire does not count as a manual stop
        timer.start(None, None);
        rx.recv().await;
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_a_stopped_timer_is_a_no_op() {
        let stops = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&stops);
        let timer = OneShotTimer::new("test", 1.0, Reason::Inactive, |_, _| {}).with_stop_callback(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        timer.stop(true);
        timer.stop(true);
        assert_eq!(stops.load(Ordering::SeqCst), 0);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_cancels_the_fire() {
        let (timer, mut rx) = recording_timer(1.0);
        timer.start(None, None);
        drop(timer);

        let received = timeout(Duration::from_secs(3600), rx.recv()).await;
        assert!(!matches!(received, Ok(Some(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_duration_arms_without_firing() {
        let (timer, mut rx) = recording_timer(u64::MAX as f64 / 60.0);
        timer.start(None, None);
        assert!(timer.is_armed());

        timer.start(Some(f64::MAX), None);
        assert!(timer.is_armed());
        assert!(timeout(Duration::from_secs(86_400 * 365), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn generation_goes_stale_after_stop_or_restart() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = OneShotTimer::new("test", 1.0, Reason::Inactive, move |_, generation| {
            let _ = tx.send(generation);
        });

        timer.start(None, None);
        let fired = rx.recv().await.unwrap();
        assert!(timer.is_current(fired));

        timer.stop(true);
        assert!(!timer.is_current(fired));

        timer.start(None, None);
        let refired = rx.recv().await.unwrap();
        assert!(timer.is_current(refired));
        timer.start(None, None);
        assert!(!timer.is_current(refired));
    }
}

//! The fixed set of timers guarding one call

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{OneShotTimer, PeriodicCountdown};
use crate::state::{Reason, TimeOptions};

/// Messages emitted by the timers of a call, tagged with the call id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerMessage {
    /// A one-shot timer elapsed; the call should end with `reason` unless
    /// `generation` is no longer the timer's latest arming
    Fired {
        call_id: u64,
        kind: TimerKind,
        generation: u64,
        reason: Reason,
    },
    /// The balance countdown ticked
    BalanceTick { call_id: u64, remaining: i64 },
    /// The user stopped typing for long enough to count as idle again
    TypingSettled { call_id: u64, generation: u64 },
}

impl TimerMessage {
    pub fn call_id(&self) -> u64 {
        match self {
            TimerMessage::Fired { call_id, .. }
            | TimerMessage::BalanceTick { call_id, .. }
            | TimerMessage::TypingSettled { call_id, .. } => *call_id,
        }
    }
}

/// Names of the timers in a [`TimerSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerKind {
    Inactivity,
    SessionLimit,
    BalanceLimit,
    TrialLimit,
    StopCallGrace,
    BalanceCountdown,
}

impl TimerKind {
    pub const ALL: [TimerKind; 6] = [
        TimerKind::Inactivity,
        TimerKind::SessionLimit,
        TimerKind::BalanceLimit,
        TimerKind::TrialLimit,
        TimerKind::StopCallGrace,
        TimerKind::BalanceCountdown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TimerKind::Inactivity => "inactivity",
            TimerKind::SessionLimit => "session_limit",
            TimerKind::BalanceLimit => "balance_limit",
            TimerKind::TrialLimit => "trial_limit",
            TimerKind::StopCallGrace => "stop_call_grace",
            TimerKind::BalanceCountdown => "balance_countdown",
        }
    }
}

/// Five termination timers and the balance countdown of a single call
///
/// Built fresh for every call attempt. Dropping the set cancels every
/// pending timer.
#[derive(Debug)]
pub struct TimerSet {
    call_id: u64,
    taster: bool,
    balance_sec: i64,
    inactivity: OneShotTimer<Reason>,
    session_limit: OneShotTimer<Reason>,
    balance_limit: OneShotTimer<Reason>,
    trial_limit: OneShotTimer<Reason>,
    stop_call_grace: OneShotTimer<Reason>,
    balance_countdown: PeriodicCountdown,
}

impl TimerSet {
    /// Build the timers for `call_id`; none of them is started
    pub fn new(call_id: u64, options: &TimeOptions, tx: mpsc::UnboundedSender<TimerMessage>) -> Self {
        let termination = |kind: TimerKind, seconds: u64, reason: Reason| {
            let tx = tx.clone();
            OneShotTimer::new(kind.name(), seconds as f64 / 60.0, reason, move |reason, generation| {
                let fired = TimerMessage::Fired {
                    call_id,
                    kind,
                    generation,
                    reason,
                };
                if let Err(e) = tx.send(fired) {
                    warn!("Failed to report {} timer: {}", kind.name(), e);
                }
            })
        };

        let countdown_tx = tx.clone();
        let balance_countdown = PeriodicCountdown::new(
            TimerKind::BalanceCountdown.name(),
            options.balance_sec(),
            move |remaining| {
                if let Err(e) = countdown_tx.send(TimerMessage::BalanceTick { call_id, remaining }) {
                    warn!("Failed to report balance tick: {}", e);
                }
            },
        );

        Self {
            call_id,
            taster: options.taster_enabled(),
            balance_sec: options.balance_sec(),
            inactivity: termination(TimerKind::Inactivity, options.active_check_sec, Reason::Inactive),
            session_limit: termination(
                TimerKind::SessionLimit,
                options.session_time_out_sec,
                Reason::Exceedslimit,
            ),
            balance_limit: termination(
                TimerKind::BalanceLimit,
                options.duration_balance_sec,
                Reason::Exceedslimit,
            ),
            trial_limit: termination(TimerKind::TrialLimit, options.taster_sec, Reason::TasterTimeCheck),
            stop_call_grace: termination(
                TimerKind::StopCallGrace,
                options.stop_call_time_sec,
                Reason::StopCallTimeCheck,
            ),
            balance_countdown,
        }
    }

    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    fn one_shot(&self, kind: TimerKind) -> Option<&OneShotTimer<Reason>> {
        match kind {
            TimerKind::Inactivity => Some(&self.inactivity),
            TimerKind::SessionLimit => Some(&self.session_limit),
            TimerKind::BalanceLimit => Some(&self.balance_limit),
            TimerKind::TrialLimit => Some(&self.trial_limit),
            TimerKind::StopCallGrace => Some(&self.stop_call_grace),
            TimerKind::BalanceCountdown => None,
        }
    }

    /// Start a timer with its configured duration
    ///
    /// Returns whether the timer is now running. Timers with a zero
    /// duration, and the trial limit outside taster mode, stay stopped.
    pub fn start(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::BalanceCountdown => self.start_countdown(self.balance_sec),
            TimerKind::TrialLimit if !self.taster => {
                debug!(call_id = self.call_id, "Taster mode off, trial limit not started");
                false
            }
            _ => match self.one_shot(kind) {
                Some(timer) => {
                    timer.start(None, None);
                    timer.is_armed()
                }
                None => false,
            },
        }
    }

    /// Start the balance countdown from `seconds`; nothing happens for a
    /// balance that is already used up
    pub fn start_countdown(&self, seconds: i64) -> bool {
        if seconds <= 0 {
            debug!(call_id = self.call_id, "No balance, countdown not started");
            return false;
        }
        self.balance_countdown.start(Some(seconds));
        true
    }

    /// Restart the countdown from a new balance if it is running
    pub fn refresh_countdown(&self, seconds: i64) -> bool {
        if !self.balance_countdown.is_running() {
            return false;
        }
        self.balance_countdown.start(Some(seconds));
        true
    }

    /// Stop a single timer as an intentional cancellation
    pub fn stop(&self, kind: TimerKind) {
        match self.one_shot(kind) {
            Some(timer) => timer.stop(true),
            None => self.balance_countdown.stop(),
        }
    }

    /// Stop every timer in the set
    pub fn stop_all(&self) {
        for kind in TimerKind::ALL {
            self.stop(kind);
        }
        debug!(call_id = self.call_id, "All call timers stopped");
    }

    /// Whether a fire of `kind` with `generation` still counts
    ///
    /// A fire stays in the channel until the coordinator gets to it; any
    /// start or stop of the same timer in between makes it stale.
    pub fn is_current(&self, kind: TimerKind, generation: u64) -> bool {
        match self.one_shot(kind) {
            Some(timer) => timer.is_current(generation),
            None => true,
        }
    }

    pub fn is_running(&self, kind: TimerKind) -> bool {
        match self.one_shot(kind) {
            Some(timer) => timer.is_armed(),
            None => self.balance_countdown.is_running(),
        }
    }

    /// Timers currently running, in declaration order
    pub fn running(&self) -> Vec<TimerKind> {
        TimerKind::ALL
            .into_iter()
            .filter(|kind| self.is_running(*kind))
            .collect()
    }

    pub fn countdown_remaining(&self) -> i64 {
        self.balance_countdown.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{timeout, Instant};

    fn options() -> TimeOptions {
        TimeOptions {
            active_check_sec: 300,
            session_time_out_sec: 0,
            duration_balance_sec: 120,
            taster: false,
            taster_sec: 60,
            stop_call_time_sec: 15,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_durations_and_disabled_taster_never_start() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let timers = TimerSet::new(1, &options(), tx);

        assert!(!timers.start(TimerKind::SessionLimit));
        assert!(!timers.start(TimerKind::TrialLimit));
        assert!(timers.start(TimerKind::Inactivity));
        assert!(timers.start(TimerKind::BalanceCountdown));

        assert_eq!(
            timers.running(),
            vec![TimerKind::Inactivity, TimerKind::BalanceCountdown]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fire_carries_call_id_and_reason() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = TimerSet::new(7, &options(), tx);
        let started = Instant::now();
        timers.start(TimerKind::StopCallGrace);

        let Some(TimerMessage::Fired {
            call_id,
            kind,
            generation,
            reason,
        }) = rx.recv().await
        else {
            panic!("expected a fire");
        };
        assert_eq!((call_id, kind, reason), (7, TimerKind::StopCallGrace, Reason::StopCallTimeCheck));
        assert!(started.elapsed() >= Duration::from_secs(15));
        assert!(!timers.is_running(TimerKind::StopCallGrace));

        assert!(timers.is_current(kind, generation));
        timers.stop(kind);
        assert!(!timers.is_current(kind, generation));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_are_tagged() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = TimerSet::new(3, &options(), tx);
        timers.start(TimerKind::BalanceCountdown);

        assert_eq!(
            rx.recv().await,
            Some(TimerMessage::BalanceTick { call_id: 3, remaining: 119 })
        );
        assert!(timers.refresh_countdown(30));
        assert_eq!(
            rx.recv().await,
            Some(TimerMessage::BalanceTick { call_id: 3, remaining: 29 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_silences_every_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let options = TimeOptions {
            session_time_out_sec: 600,
            taster: true,
            ..options()
        };
        let timers = TimerSet::new(1, &options, tx);
        for kind in TimerKind::ALL {
            assert!(timers.start(kind), "{} should start", kind.name());
        }

        timers.stop_all();
        assert!(timers.running().is_empty());
        assert!(!timers.refresh_countdown(10));
        assert!(timeout(Duration::from_secs(3600), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_set_cancels_pending_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = TimerSet::new(1, &options(), tx.clone());
        timers.start(TimerKind::Inactivity);
        drop(timers);

        assert!(timeout(Duration::from_secs(3600), rx.recv()).await.is_err());
        drop(tx);
    }
}

//! Call lifecycle coordinator
//!
//! Decides, for every command, engine event and timer message, which call
//! timers to start or stop, and when the call ends. The coordinator is
//! plain synchronous state; the actor in [`crate::tasks`] feeds it one
//! message at a time.

pub mod observer;


use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
    engine::EngineEvent,
    error::{CallError, CallResult},
    state::{CallAction, CallMode, CallSession, CallStatus, Reason, SessionSnapshot, StartOptions, TimeOptions},
    timers::{OneShotTimer, TimerKind, TimerMessage, TimerSet},
};

pub use observer::{BroadcastObserver, CallNotice, CallObserver, ErrorSource, LoggingObserver, NoopObserver};

/// Quiet period after the last keystroke before inactivity counts again
pub const TYPING_SETTLE_SEC: f64 = 0.4;

/// Inputs the coordinator accepts from the host application
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start a new call
    Start(StartOptions),
    /// Start a new call with the options of the previous one
    Restart,
    /// Tear the call down; `None` ends it without notifying the host
    Stop(Option<Reason>),
    /// Engine init or start failed
    StartFailed(String),
    /// An event from the avatar engine
    Engine(EngineEvent),
    /// New account balance in seconds
    UpdateBalance(u64),
    /// The avatar is saying goodbye with utterance `ext`
    BeginStopGrace(String),
    /// The user is typing
    Typing,
    /// The user sent typed text
    TextSent,
    /// The host is going away; stops a live call with `Unmount`
    Unmount,
    /// No-op; used to read a snapshot ordered after earlier commands
    Snapshot,
}

/// Owns the session state and the timers of the current call
pub struct LifecycleCoordinator {
    session: CallSession,
    defaults: TimeOptions,
    last_start: Option<StartOptions>,
    timers: Option<TimerSet>,
    timer_tx: mpsc::UnboundedSender<TimerMessage>,
    typing_settle: OneShotTimer<u64>,
    /// Utterance whose speech must not count as activity
    suppressed_utterance: Option<String>,
    observer: Arc<dyn CallObserver>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl LifecycleCoordinator {
    /// Create an idle coordinator whose timers report to `timer_tx`
    pub fn new(
        defaults: TimeOptions,
        observer: Arc<dyn CallObserver>,
        timer_tx: mpsc::UnboundedSender<TimerMessage>,
    ) -> Self {
        let session = CallSession::default();
        let (snapshot_tx, _) = watch::channel(session.snapshot());

        let settle_tx = timer_tx.clone();
        let typing_settle = OneShotTimer::new("typing_settle", TYPING_SETTLE_SEC / 60.0, 0, move |call_id, generation| {
            if let Err(e) = settle_tx.send(TimerMessage::TypingSettled { call_id, generation }) {
                warn!("Failed to report typing settle: {}", e);
            }
        });

        Self {
            session,
            defaults,
            last_start: None,
            timers: None,
            timer_tx,
            typing_settle,
            suppressed_utterance: None,
            observer,
            snapshot_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn status(&self) -> CallStatus {
        self.session.status
    }

    pub fn timers(&self) -> Option<&TimerSet> {
        self.timers.as_ref()
    }

    /// Apply one host command
    pub fn apply(&mut self, command: Command) -> CallResult<()> {
        match command {
            Command::Start(options) => self.start_call(options).map(|_| ()),
            Command::Restart => self.restart_call().map(|_| ()),
            Command::Stop(reason) => {
                self.stop_call(reason);
                Ok(())
            }
            Command::StartFailed(message) => {
                self.start_failed(&message);
                Ok(())
            }
            Command::Engine(event) => {
                self.handle_engine_event(event);
                Ok(())
            }
            Command::UpdateBalance(seconds) => {
                self.update_balance(seconds);
                Ok(())
            }
            Command::BeginStopGrace(ext) => self.begin_stop_grace(ext),
            Command::Typing => {
                self.user_typing();
                Ok(())
            }
            Command::TextSent => {
                self.text_sent();
                Ok(())
            }
            Command::Unmount => {
                self.unmount();
                Ok(())
            }
            Command::Snapshot => Ok(()),
        }
    }

    /// Begin a new call attempt with a fresh set of timers
    pub fn start_call(&mut self, options: StartOptions) -> CallResult<u64> {
        if !self.session.status.can_start() {
            warn!("Refusing to start a call while {}", self.session.status);
            return Err(CallError::CallInProgress(self.session.status));
        }

        let mut defaults = self.defaults.clone();
        if self.session.balance_sec > 0 {
            defaults.duration_balance_sec = self.session.balance_sec as u64;
        }
        let resolved = options.resolve(&defaults);

        self.discard_timers();
        self.session.begin(options.mode, resolved);
        self.timers = Some(TimerSet::new(
            self.session.call_id,
            &self.session.options,
            self.timer_tx.clone(),
        ));
        self.last_start = Some(options);

        info!(
            call_id = self.session.call_id,
            "Call starting in {:?} mode: {:?}", self.session.mode, self.session.options
        );
        self.publish();
        Ok(self.session.call_id)
    }

    /// Start again with the options of the last start
    pub fn restart_call(&mut self) -> CallResult<u64> {
        let options = self.last_start.clone().ok_or(CallError::NothingToRestart)?;
        self.start_call(options)
    }

    /// Tear the call down: stop every timer, set the stop marker and tell
    /// the host when a reason is given
    pub fn stop_call(&mut self, reason: Option<Reason>) {
        self.discard_timers();
        self.session.mark_stopped(reason);

        match reason {
            Some(reason) => {
                info!(call_id = self.session.call_id, "Call stopped: {}", reason);
                self.observer.on_stop(reason);
            }
            None => info!(call_id = self.session.call_id, "Call stopped"),
        }
        self.publish();
    }

    /// Stop a connecting or connected call because the host is going away
    pub fn unmount(&mut self) {
        if matches!(self.session.status, CallStatus::Connecting | CallStatus::Connected) {
            self.stop_call(Some(Reason::Unmount));
        }
    }

    /// Engine init or start failed before the call went live
    pub fn start_failed(&mut self, message: &str) {
        self.report_error(message, ErrorSource::Start);
        self.discard_timers();
        self.session.status = CallStatus::Stopped;
        self.session.clear_conversation_flags();
        self.publish();
    }

    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        debug!(call_id = self.session.call_id, "Engine event: {:?}", event);
        match event {
            EngineEvent::Show { session_id } => self.on_show(session_id),
            EngineEvent::SpeakStart { ext } => {
                self.session.waiting_answer = false;
                let suppressed = ext.is_some() && ext == self.suppressed_utterance;
                if suppressed {
                    debug!("Speech of suppressed utterance, inactivity left running");
                } else {
                    self.stop_timer(TimerKind::Inactivity);
                }
            }
            EngineEvent::SpeakEnd { .. } => self.start_timer(TimerKind::Inactivity),
            EngineEvent::AsrStart => {
                self.session.inputting = true;
                self.stop_timer(TimerKind::Inactivity);
            }
            EngineEvent::AsrStop => {
                self.session.waiting_answer = true;
                self.session.inputting = false;
            }
            EngineEvent::TtsSpeakStart => {
                if self.session.mode == CallMode::Audio {
                    self.session.waiting_answer = true;
                }
            }
            EngineEvent::TtsSpeakEnd => {
                if self.session.mode == CallMode::Audio {
                    self.session.waiting_answer = false;
                }
            }
            EngineEvent::Bye => {
                self.stop_call(Some(Reason::Bye));
                return;
            }
            EngineEvent::Error { message } => {
                self.report_error(&message, ErrorSource::Engine);
                self.stop_timer(TimerKind::Inactivity);
            }
        }
        self.publish();
    }

    fn on_show(&mut self, session_id: Option<String>) {
        if self.session.stop_marker.is_some() {
            info!(call_id = self.session.call_id, "Engine ready after the call was stopped");
            self.stop_call(Some(Reason::StopMarker));
            return;
        }
        if self.session.status != CallStatus::Connecting {
            debug!("Ignoring ready event while {}", self.session.status);
            return;
        }
        let Some(timers) = self.timers.as_ref() else {
            warn!(call_id = self.session.call_id, "Ready event without call timers");
            return;
        };

        let options = &self.session.options;
        if options.session_time_out_sec > 0 {
            timers.start(TimerKind::SessionLimit);
        }
        timers.start(TimerKind::Inactivity);
        timers.start(TimerKind::BalanceLimit);
        timers.start_countdown(self.session.balance_sec);
        let taster = options.taster_enabled();
        if taster {
            timers.start(TimerKind::TrialLimit);
        }

        info!(
            call_id = self.session.call_id,
            "Call connected, running timers: {:?}",
            timers.running()
        );
        self.session.status = CallStatus::Connected;
        self.session.session_id = session_id;

        if taster {
            self.observer
                .on_action(&CallAction::StartSession(self.session.session_id.clone()));
        }
    }

    /// Handle a message from the timers of some call
    pub fn handle_timer_message(&mut self, message: TimerMessage) {
        if message.call_id() != self.session.call_id || self.session.status != CallStatus::Connected {
            debug!(
                call_id = self.session.call_id,
                "Ignoring stale timer message: {:?}", message
            );
            return;
        }

        match message {
            TimerMessage::Fired {
                kind,
                generation,
                reason,
                ..
            } => {
                let current = self
                    .timers
                    .as_ref()
                    .is_some_and(|timers| timers.is_current(kind, generation));
                if !current {
                    debug!(
                        call_id = self.session.call_id,
                        "Dropping {} fire superseded before it was handled",
                        kind.name()
                    );
                    return;
                }
                info!(call_id = self.session.call_id, "Call timer elapsed: {}", reason);
                self.stop_call(Some(reason));
            }
            TimerMessage::BalanceTick { remaining, .. } => {
                self.session.balance_sec = remaining;
                self.observer.on_balance(remaining);
                self.publish();
            }
            TimerMessage::TypingSettled { generation, .. } => {
                if self.typing_settle.is_current(generation) {
                    self.start_timer(TimerKind::Inactivity);
                } else {
                    debug!("Dropping superseded typing settle");
                }
            }
        }
    }

    /// Record a new balance and restart a running countdown from it
    pub fn update_balance(&mut self, seconds: u64) {
        if seconds == 0 {
            debug!("Ignoring empty balance update");
            return;
        }
        let balance = i64::try_from(seconds).unwrap_or(i64::MAX);
        self.session.balance_sec = balance;
        if let Some(timers) = &self.timers {
            if timers.refresh_countdown(balance) {
                debug!("Balance countdown restarted from {}s", seconds);
            }
        }
        self.publish();
    }

    /// Start the stop-call grace period for a farewell utterance
    pub fn begin_stop_grace(&mut self, ext: String) -> CallResult<()> {
        if self.session.status != CallStatus::Connected {
            return Err(CallError::NotConnected(self.session.status));
        }

        info!(call_id = self.session.call_id, "Stop grace period for utterance {}", ext);
        self.suppressed_utterance = Some(ext);
        self.start_timer(TimerKind::StopCallGrace);
        Ok(())
    }

    /// Typing counts as activity until the user pauses
    pub fn user_typing(&mut self) {
        if self.session.status != CallStatus::Connected {
            return;
        }
        self.stop_timer(TimerKind::Inactivity);
        self.typing_settle.start(None, Some(self.session.call_id));
    }

    /// Typed text was sent; wait for the answer before counting inactivity
    pub fn text_sent(&mut self) {
        if self.session.status != CallStatus::Connected {
            return;
        }
        self.typing_settle.stop(false);
        self.stop_timer(TimerKind::Inactivity);
        self.session.inputting = false;
        self.session.waiting_answer = true;
        self.publish();
    }

    fn start_timer(&self, kind: TimerKind) {
        if self.session.status != CallStatus::Connected {
            return;
        }
        if let Some(timers) = &self.timers {
            timers.start(kind);
        }
    }

    fn stop_timer(&self, kind: TimerKind) {
        if let Some(timers) = &self.timers {
            timers.stop(kind);
        }
    }

    fn report_error(&self, message: &str, source: ErrorSource) {
        if self.session.is_stopped() {
            debug!("Suppressing error after call stopped: {}", message);
            return;
        }
        self.observer.on_error(message, source);
    }

    /// Stop and drop the current timer set and any side timers
    fn discard_timers(&mut self) {
        if let Some(timers) = self.timers.take() {
            timers.stop_all();
        }
        self.typing_settle.stop(false);
        self.suppressed_utterance = None;
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.session.snapshot());
    }
}

impl Drop for LifecycleCoordinator {
    fn drop(&mut self) {
        self.discard_timers();
    }
}

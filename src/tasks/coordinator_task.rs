//! Coordinator actor task
//!
//! Commands, engine events and timer messages all funnel into one task so
//! they are handled strictly one at a time, in arrival order.

use std::sync::Arc;
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    coordinator::{BroadcastObserver, CallNotice, CallObserver, Command, LifecycleCoordinator},
    error::{CallError, CallResult},
    state::{SessionSnapshot, TimeOptions},
    timers::TimerMessage,
};

/// Buffered notices per subscriber
const NOTICE_CAPACITY: usize = 64;

type Reply = oneshot::Sender<CallResult<SessionSnapshot>>;

struct Envelope {
    command: Command,
    reply: Option<Reply>,
}

/// Cloneable handle for talking to a running coordinator
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Envelope>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    notices: BroadcastObserver,
}

impl CoordinatorHandle {
    /// Queue a command without waiting for it to be handled
    pub fn send(&self, command: Command) -> CallResult<()> {
        self.tx
            .send(Envelope { command, reply: None })
            .map_err(|_| CallError::CoordinatorClosed)
    }

    /// Queue a command and wait for the resulting snapshot
    pub async fn request(&self, command: Command) -> CallResult<SessionSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                command,
                reply: Some(reply_tx),
            })
            .map_err(|_| CallError::CoordinatorClosed)?;
        reply_rx.await.map_err(|_| CallError::CoordinatorClosed)?
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Terminations, errors and actions from now on
    pub fn subscribe_notices(&self) -> broadcast::Receiver<CallNotice> {
        self.notices.subscribe()
    }

    /// A sender that does not keep the coordinator task alive
    pub fn downgrade(&self) -> WeakCoordinatorHandle {
        WeakCoordinatorHandle {
            tx: self.tx.downgrade(),
        }
    }
}

/// Fire-and-forget sender that lets the task wind down once every
/// [`CoordinatorHandle`] is gone
#[derive(Clone)]
pub struct WeakCoordinatorHandle {
    tx: mpsc::WeakUnboundedSender<Envelope>,
}

impl WeakCoordinatorHandle {
    pub fn send(&self, command: Command) -> CallResult<()> {
        self.tx
            .upgrade()
            .ok_or(CallError::CoordinatorClosed)?
            .send(Envelope { command, reply: None })
            .map_err(|_| CallError::CoordinatorClosed)
    }
}

/// Spawn the coordinator task
///
/// `observer` receives every decision in addition to the handle's notice
/// subscribers. The task ends once every handle has been dropped, stopping
/// a live call with [`crate::state::Reason::Unmount`] first.
pub fn spawn_coordinator(
    defaults: TimeOptions,
    observer: Arc<dyn CallObserver>,
) -> (CoordinatorHandle, JoinHandle<()>) {
    let notices = BroadcastObserver::new(NOTICE_CAPACITY);
    let observers: Vec<Arc<dyn CallObserver>> = vec![Arc::new(notices.clone()), observer];

    let (timer_tx, timer_rx) = mpsc::unbounded_channel();
    let coordinator = LifecycleCoordinator::new(defaults, Arc::new(observers), timer_tx);
    let snapshot_rx = coordinator.subscribe();

    let (tx, command_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(coordinator_task(coordinator, command_rx, timer_rx));

    (
        CoordinatorHandle {
            tx,
            snapshot_rx,
            notices,
        },
        task,
    )
}

async fn coordinator_task(
    mut coordinator: LifecycleCoordinator,
    mut command_rx: mpsc::UnboundedReceiver<Envelope>,
    mut timer_rx: mpsc::UnboundedReceiver<TimerMessage>,
) {
    info!("Starting call coordinator task");

    loop {
        tokio::select! {
            envelope = command_rx.recv() => {
                let Some(Envelope { command, reply }) = envelope else {
                    break;
                };

                debug!("Coordinator received command: {:?}", command);
                let result = coordinator.apply(command);
                if let Err(e) = &result {
                    warn!("Command refused: {}", e);
                }

                if let Some(reply) = reply {
                    // the requester may have given up waiting
                    let _ = reply.send(result.map(|_| coordinator.snapshot()));
                }
            }

            Some(message) = timer_rx.recv() => {
                coordinator.handle_timer_message(message);
            }
        }
    }

    coordinator.unmount();
    info!("Call coordinator task stopped");
}

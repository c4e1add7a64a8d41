//! Outbound notifications from the coordinator to the host application

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::state::{CallAction, Reason};

/// Where a reported error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorSource {
    /// Raised by the avatar engine during a call
    Engine,
    /// Engine init or start failed
    Start,
}

/// Receives the coordinator's decisions
///
/// `on_stop` is the single "terminate call" action: the host tears down the
/// engine when it arrives. Every method defaults to doing nothing.
pub trait CallObserver: Send + Sync {
    fn on_stop(&self, _reason: Reason) {}

    fn on_error(&self, _message: &str, _source: ErrorSource) {}

    fn on_action(&self, _action: &CallAction) {}

    fn on_balance(&self, _remaining: i64) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CallObserver for NoopObserver {}

impl CallObserver for Vec<Arc<dyn CallObserver>> {
    fn on_stop(&self, reason: Reason) {
        self.iter().for_each(|o| o.on_stop(reason));
    }

    fn on_error(&self, message: &str, source: ErrorSource) {
        self.iter().for_each(|o| o.on_error(message, source));
    }

    fn on_action(&self, action: &CallAction) {
        self.iter().for_each(|o| o.on_action(action));
    }

    fn on_balance(&self, remaining: i64) {
        self.iter().for_each(|o| o.on_balance(remaining));
    }
}

/// A notification as published to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CallNotice {
    Stopped { reason: Reason },
    Error { message: String, source: ErrorSource },
    Action { action: CallAction },
}

/// Publishes terminations, errors and actions on a broadcast channel
///
/// Balance ticks are left out; they are visible through the session snapshot.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<CallNotice>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallNotice> {
        self.tx.subscribe()
    }

    fn publish(&self, notice: CallNotice) {
        // no subscribers is fine
        if self.tx.receiver_count() == 0 {
            return;
        }
        if let Err(e) = self.tx.send(notice) {
            warn!("Failed to publish call notice: {}", e);
        }
    }
}

impl CallObserver for BroadcastObserver {
    fn on_stop(&self, reason: Reason) {
        self.publish(CallNotice::Stopped { reason });
    }

    fn on_error(&self, message: &str, source: ErrorSource) {
        self.publish(CallNotice::Error {
            message: message.to_string(),
            source,
        });
    }

    fn on_action(&self, action: &CallAction) {
        self.publish(CallNotice::Action {
            action: action.clone(),
        });
    }
}

/// Logs every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl CallObserver for LoggingObserver {
    fn on_stop(&self, reason: Reason) {
        if reason.is_timer_driven() {
            info!("Call timed out: {}", reason);
        } else {
            info!("Call terminated: {}", reason);
        }
    }

    fn on_error(&self, message: &str, source: ErrorSource) {
        warn!("Call error ({:?}): {}", source, message);
    }

    fn on_action(&self, action: &CallAction) {
        info!("Call action: {:?}", action);
    }

    fn on_balance(&self, remaining: i64) {
        debug!("Balance remaining: {}s", remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_observer_publishes_notices() {
        let observer = BroadcastObserver::new(8);
        let mut rx = observer.subscribe();

        observer.on_stop(Reason::Bye);
        observer.on_balance(10);
        observer.on_error("boom", ErrorSource::Engine);

        assert_eq!(rx.recv().await.unwrap(), CallNotice::Stopped { reason: Reason::Bye });
        assert_eq!(
            rx.recv().await.unwrap(),
            CallNotice::Error { message: "boom".to_string(), source: ErrorSource::Engine }
        );
    }

    #[test]
    fn notices_serialize_with_type_tag() {
        let json = serde_json::to_value(CallNotice::Stopped { reason: Reason::Inactive }).unwrap();
        assert_eq!(json["type"], "stopped");
        assert_eq!(json["reason"], "inactive");
    }
}

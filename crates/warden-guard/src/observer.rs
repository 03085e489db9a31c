//! Action observers: synchronous notification of every state change.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{trace, warn};
use warden_core::Action;

/// Receives a snapshot of an action each time it is captured or changes
/// state.
///
/// Called inline on the guard's task: implementations must return quickly
/// and never block. A panicking observer is logged and skipped.
pub trait ActionObserver: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Handle a snapshot.
    fn on_action(&self, action: &Action);
}

/// The observers registered on one guard.
#[derive(Clone, Default)]
pub(crate) struct ObserverSet {
    observers: Vec<Arc<dyn ActionObserver>>,
}

impl ObserverSet {
    pub(crate) fn push(&mut self, observer: Arc<dyn ActionObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Notify every observer, isolating panics.
    pub(crate) fn notify(&self, action: &Action) {
        for observer in &self.observers {
            trace!(
                observer = observer.name(),
                action_id = %action.id,
                status = %action.status,
                "notifying observer"
            );
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                observer.on_action(action);
            }));
            if let Err(e) = result {
                warn!(
                    observer = observer.name(),
                    action_id = %action.id,
                    error = ?e,
                    "observer panicked"
                );
            }
        }
    }
}

/// Forwards snapshots into a bounded channel.
///
/// Uses `try_send`: when the consumer falls behind, snapshots are dropped
/// and logged rather than stalling the guard.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    name: String,
    tx: mpsc::Sender<Action>,
}

impl ChannelObserver {
    /// Create an observer and the receiver its snapshots arrive on.
    #[must_use]
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Action>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }
}

impl ActionObserver for ChannelObserver {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_action(&self, action: &Action) {
        if let Err(e) = self.tx.try_send(action.clone()) {
            warn!(
                observer = %self.name,
                action_id = %action.id,
                error = %e,
                "dropping action snapshot"
            );
        }
    }
}

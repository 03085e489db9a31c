//! Undo coordination: compensate an executed action, then mark it undone.
//!
//! # Undo Flow
//!
//! 1. Load the record (`NotFound` if absent)
//! 2. Refuse irreversible actions (`NotReversible`)
//! 3. Refuse a second undo (`AlreadyUndone`)
//! 4. Require `executed` (otherwise an invalid-transition error)
//! 5. Run the compensator registered for the action's kind, if any
//! 6. Transition to `undone`
//!
//! A failing compensator leaves the record untouched. Concurrent undo calls
//! on the same id are serialised, so a compensator runs at most once per
//! action.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use warden_audit::ActionStore;
use warden_core::{Action, ActionId, ActionKind, ActionStatus, ActionUpdate, CoreError};

use crate::error::{GuardError, GuardOpResult};

/// Reverses the effect of an executed action.
///
/// Receives the full record, including the `undo_data` captured with it.
#[async_trait]
pub trait Compensator: Send + Sync {
    /// Undo the action's effect.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason if the effect could not be reversed.
    async fn compensate(&self, action: &Action) -> Result<(), String>;
}

/// Runs compensators and records undo transitions.
pub(crate) struct UndoCoordinator {
    store: Arc<dyn ActionStore>,
    compensators: HashMap<ActionKind, Arc<dyn Compensator>>,
    locks: DashMap<ActionId, Arc<Mutex<()>>>,
}

impl UndoCoordinator {
    pub(crate) fn new(
        store: Arc<dyn ActionStore>,
        compensators: HashMap<ActionKind, Arc<dyn Compensator>>,
    ) -> Self {
        Self {
            store,
            compensators,
            locks: DashMap::new(),
        }
    }

    pub(crate) fn compensator_count(&self) -> usize {
        self.compensators.len()
    }

    pub(crate) async fn undo(&self, id: ActionId) -> GuardOpResult<Action> {
        let lock = Arc::clone(self.locks.entry(id).or_default().value());
        let outcome = {
            let _held = lock.lock().await;
            self.undo_locked(id).await
        };
        drop(lock);
        self.locks
            .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    async fn undo_locked(&self, id: ActionId) -> GuardOpResult<Action> {
        let action = self.store.get(id).await?.ok_or(GuardError::NotFound(id))?;

        if !action.reversible {
            return Err(GuardError::NotReversible(id));
        }
        if action.status == ActionStatus::Undone {
            return Err(GuardError::AlreadyUndone(id));
        }
        if !action.status.can_transition_to(ActionStatus::Undone) {
            return Err(CoreError::InvalidTransition {
                from: action.status,
                to: ActionStatus::Undone,
            }
            .into());
        }

        match self.compensators.get(&action.kind) {
            Some(compensator) => {
                compensator.compensate(&action).await.map_err(|reason| {
                    warn!(action_id = %id, kind = %action.kind, %reason, "compensation failed");
                    GuardError::Compensation { id, reason }
                })?;
            },
            None => debug!(action_id = %id, kind = %action.kind, "no compensator, recording undo only"),
        }

        let undone = self
            .store
            .update(id, &ActionUpdate::status(ActionStatus::Undone))
            .await?;
        info!(action_id = %id, kind = %undone.kind, "action undone");
        Ok(undone)
    }
}

/// Prior state of a file, stored as an action's `undo_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    /// File the action touched.
    pub path: PathBuf,
    /// Content before the action; `None` if the file did not exist.
    pub previous_content: Option<String>,
}

impl FileSnapshot {
    /// Record the current state of `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error other than "not found".
    pub async fn capture(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let previous_content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        Ok(Self {
            path,
            previous_content,
        })
    }

    /// The snapshot as an `undo_data` payload.
    ///
    /// Paths that are not valid UTF-8 cannot be recorded and yield `null`.
    #[must_use]
    pub fn to_undo_data(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Restores files from a [`FileSnapshot`] in `undo_data`.
///
/// Rewrites the previous content, or removes the file if it did not exist
/// before the action. Suitable for `file.write` and `file.delete`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRestoreCompensator;

#[async_trait]
impl Compensator for FileRestoreCompensator {
    async fn compensate(&self, action: &Action) -> Result<(), String> {
        let undo_data = action
            .undo_data
            .clone()
            .ok_or_else(|| "no undo data recorded".to_owned())?;
        let snapshot: FileSnapshot = serde_json::from_value(undo_data)
            .map_err(|e| format!("malformed file snapshot: {e}"))?;

        match &snapshot.previous_content {
            Some(content) => tokio::fs::write(&snapshot.path, content)
                .await
                .map_err(|e| format!("failed to restore {}: {e}", snapshot.path.display())),
            None => match tokio::fs::remove_file(&snapshot.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(format!(
                    "failed to remove {}: {e}",
                    snapshot.path.display()
                )),
            },
        }
    }
}

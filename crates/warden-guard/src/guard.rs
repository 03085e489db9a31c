//! The guard: mediates every agent action from capture to outcome.
//!
//! # Guard Flow
//!
//! 1. Capture: resolve risk, insert a `pending` record, notify observers
//! 2. Gate: required when the risk meets the threshold or the policy feed
//!    blocks; ask the approval handler, bounded by the approval timeout
//! 3. Anything but an explicit approval blocks the action and the operation
//!    is never invoked
//! 4. Execute: run the operation, catching panics and bounding it by the
//!    execution timeout
//! 5. Record `executed` with the serialised value, or `failed` with the error

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use warden_audit::{ActionStore, KvActionStore};
use warden_core::{
    Action, ActionId, ActionKind, ActionStatus, ActionUpdate, NewAction, QueryFilter, RiskLevel,
    StatsSnapshot,
};
use warden_risk::RiskClassifier;

use crate::approval::{ApprovalDecision, ApprovalHandler};
use crate::config::GuardConfig;
use crate::error::{ExecutionError, GuardError, GuardOpResult};
use crate::observer::{ActionObserver, ObserverSet};
use crate::outcome::{GuardResult, Outcome};
use crate::policy::{PolicyFeed, PolicyVerdict};
use crate::undo::{Compensator, UndoCoordinator};

/// Builder for a [`Guard`].
#[derive(Default)]
pub struct GuardBuilder {
    store: Option<Arc<dyn ActionStore>>,
    config: GuardConfig,
    classifier: RiskClassifier,
    approval: Option<Arc<dyn ApprovalHandler>>,
    policy: Option<Arc<dyn PolicyFeed>>,
    observers: ObserverSet,
    compensators: HashMap<ActionKind, Arc<dyn Compensator>>,
}

impl GuardBuilder {
    /// Start from the built-in defaults and an in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration.
    ///
    /// Opens the audit backend named in `[audit]`. Relative storage paths
    /// resolve against `workspace_root`.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Config`] for values the guard cannot use, or a
    /// storage error if the backend cannot be opened.
    pub fn from_config(
        config: &warden_config::Config,
        workspace_root: Option<&Path>,
    ) -> GuardOpResult<Self> {
        let guard_config = GuardConfig::try_from(&config.guard)?;

        let audit_path = PathBuf::from(&config.audit.path);
        let audit_path = match workspace_root {
            Some(root) if audit_path.is_relative() => root.join(audit_path),
            _ => audit_path,
        };

        let store: Arc<dyn ActionStore> = match config.audit.backend.as_str() {
            "memory" => Arc::new(KvActionStore::in_memory()?),
            #[cfg(feature = "kv")]
            "surrealkv" => Arc::new(KvActionStore::open(&audit_path)?),
            #[cfg(not(feature = "kv"))]
            "surrealkv" => {
                return Err(GuardError::Config {
                    field: "audit.backend".to_owned(),
                    message: format!(
                        "cannot open {}: built without the `kv` feature",
                        audit_path.display()
                    ),
                });
            },
            other => {
                return Err(GuardError::Config {
                    field: "audit.backend".to_owned(),
                    message: format!("unsupported backend '{other}'"),
                });
            },
        };

        Ok(Self::new().config(guard_config).store(store))
    }

    /// Use this audit store.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn ActionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the guard settings.
    #[must_use]
    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the risk classifier.
    #[must_use]
    pub fn classifier(mut self, classifier: RiskClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Set the approval handler for gated actions.
    #[must_use]
    pub fn approval_handler(mut self, handler: Arc<dyn ApprovalHandler>) -> Self {
        self.approval = Some(handler);
        self
    }

    /// Set the policy feed.
    #[must_use]
    pub fn policy(mut self, policy: Arc<dyn PolicyFeed>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Add an observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn ActionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Register the compensator used to undo actions of `kind`.
    #[must_use]
    pub fn compensator(
        mut self,
        kind: impl Into<ActionKind>,
        compensator: Arc<dyn Compensator>,
    ) -> Self {
        self.compensators.insert(kind.into(), compensator);
        self
    }

    /// Build the guard.
    ///
    /// # Errors
    ///
    /// Returns a storage error if no store was given and the in-memory
    /// default cannot be created.
    pub fn build(self) -> GuardOpResult<Guard> {
        let store: Arc<dyn ActionStore> = match self.store {
            Some(store) => store,
            None => Arc::new(KvActionStore::in_memory()?),
        };

        if let Some(threshold) = self.config.approval_threshold {
            if self.approval.is_none() {
                warn!(%threshold, "no approval handler: gated actions will be blocked");
            }
            if self.config.approval_timeout.is_none() {
                warn!(%threshold, "approval timeout disabled: gated actions may wait indefinitely");
            }
        }

        let undo = UndoCoordinator::new(Arc::clone(&store), self.compensators);
        Ok(Guard {
            store,
            config: self.config,
            classifier: self.classifier,
            approval: self.approval,
            policy: self.policy,
            observers: self.observers,
            undo,
        })
    }
}

/// Mediates agent actions: classify, gate, execute, audit, undo.
///
/// An explicit context object; any number of guards may coexist, each with
/// its own store and handlers.
///
/// # Example
///
/// ```
/// use warden_core::{ActionKind, ActionStatus, NewAction};
/// use warden_guard::Guard;
///
/// # async fn example() {
/// let guard = Guard::builder().build().unwrap();
///
/// let result = guard
///     .guard(NewAction::new(ActionKind::FileRead, "Read README"), || async {
///         Ok::<_, std::io::Error>(42)
///     })
///     .await
///     .unwrap();
///
/// assert_eq!(result.value(), Some(&42));
/// assert_eq!(result.action.status, ActionStatus::Executed);
/// # }
/// ```
pub struct Guard {
    store: Arc<dyn ActionStore>,
    config: GuardConfig,
    classifier: RiskClassifier,
    approval: Option<Arc<dyn ApprovalHandler>>,
    policy: Option<Arc<dyn PolicyFeed>>,
    observers: ObserverSet,
    undo: UndoCoordinator,
}

impl Guard {
    /// Start building a guard.
    #[must_use]
    pub fn builder() -> GuardBuilder {
        GuardBuilder::new()
    }

    /// The active settings.
    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Run `operation` under the guard.
    ///
    /// Returns `Ok` for every outcome of the operation, including blocked
    /// and failed ones; see [`GuardResult`].
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or the audit store fails.
    /// A storage failure after the operation ran is still an error: the
    /// operation's effect may have happened without being recorded.
    pub async fn guard<T, E, F, Fut>(
        &self,
        request: NewAction,
        operation: F,
    ) -> GuardOpResult<GuardResult<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: fmt::Display,
    {
        let action = self.capture(request).await?;
        let id = action.id;

        if let Some(gate_reason) = self.gate_reason(&action).await {
            debug!(action_id = %id, reason = %gate_reason, "approval required");
            match self.request_approval(&action).await {
                Ok(()) => {
                    self.transition(id, ActionUpdate::status(ActionStatus::Approved))
                        .await?;
                },
                Err(reason) => {
                    let blocked = self.block(id, reason.clone()).await?;
                    return Ok(GuardResult {
                        action: blocked,
                        outcome: Outcome::Blocked { reason },
                    });
                },
            }
        }

        match self.execute(operation).await {
            Ok(value) => {
                let result = serde_json::to_value(&value).unwrap_or_else(|e| {
                    warn!(action_id = %id, error = %e, "result is not serialisable, recording null");
                    Value::Null
                });
                let action = self.complete(id, result).await?;
                Ok(GuardResult {
                    action,
                    outcome: Outcome::Executed(value),
                })
            },
            Err(err) => {
                let action = self.fail(id, err.to_string()).await?;
                Ok(GuardResult {
                    action,
                    outcome: Outcome::Failed(err),
                })
            },
        }
    }

    /// Record a pending action without executing anything.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Validation`] for a malformed request, or a
    /// storage error.
    pub async fn capture(&self, request: NewAction) -> GuardOpResult<Action> {
        let risk = self.resolve_risk(&request);
        let action = Action::capture(request, risk, &self.config.default_agent)?;
        self.store.insert(&action).await?;
        debug!(
            action_id = %action.id,
            kind = %action.kind,
            agent = %action.agent,
            risk = %action.risk,
            "action captured"
        );
        self.observers.notify(&action);
        Ok(action)
    }

    /// Mark a pending action approved.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::NotFound`] or an invalid-transition error.
    pub async fn approve(&self, id: ActionId) -> GuardOpResult<Action> {
        self.transition(id, ActionUpdate::status(ActionStatus::Approved))
            .await
    }

    /// Mark a pending action blocked.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::NotFound`] or an invalid-transition error.
    pub async fn block(&self, id: ActionId, reason: impl Into<String>) -> GuardOpResult<Action> {
        let reason = reason.into();
        let action = self
            .transition(id, ActionUpdate::status(ActionStatus::Blocked))
            .await?;
        warn!(
            action_id = %id,
            kind = %action.kind,
            risk = %action.risk,
            %reason,
            "action blocked"
        );
        Ok(action)
    }

    /// Record a successful execution.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::NotFound`] or an invalid-transition error.
    pub async fn complete(&self, id: ActionId, result: Value) -> GuardOpResult<Action> {
        let action = self.transition(id, ActionUpdate::executed(result)).await?;
        info!(action_id = %id, kind = %action.kind, risk = %action.risk, "action executed");
        Ok(action)
    }

    /// Record a failed execution.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::NotFound`] or an invalid-transition error.
    pub async fn fail(&self, id: ActionId, error: impl Into<String>) -> GuardOpResult<Action> {
        let error = error.into();
        let action = self.transition(id, ActionUpdate::failed(error.clone())).await?;
        info!(action_id = %id, kind = %action.kind, %error, "action failed");
        Ok(action)
    }

    /// Compensate an executed action and mark it undone.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::NotFound`], [`GuardError::NotReversible`],
    /// [`GuardError::AlreadyUndone`], an invalid-transition error for
    /// actions that never executed, or [`GuardError::Compensation`].
    pub async fn undo(&self, id: ActionId) -> GuardOpResult<Action> {
        let action = self.undo.undo(id).await?;
        self.observers.notify(&action);
        Ok(action)
    }

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn get(&self, id: ActionId) -> GuardOpResult<Option<Action>> {
        Ok(self.store.get(id).await?)
    }

    /// Search the audit trail.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn query(&self, filter: &QueryFilter) -> GuardOpResult<Vec<Action>> {
        Ok(self.store.query(filter).await?)
    }

    /// Totals by risk, status and agent.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn stats(&self) -> GuardOpResult<StatsSnapshot> {
        Ok(self.store.stats().await?)
    }

    fn resolve_risk(&self, request: &NewAction) -> RiskLevel {
        if let Some(risk) = request.risk {
            return risk;
        }
        if !self.config.auto_classify {
            return self.config.default_risk;
        }
        let assessment = self.classifier.assess(request);
        for escalation in &assessment.escalations {
            debug!(
                kind = %request.kind,
                family = %escalation.family,
                pattern = escalation.pattern,
                "risk escalated"
            );
        }
        assessment.level
    }

    /// Why the action must pass the approval gate, if it must.
    async fn gate_reason(&self, action: &Action) -> Option<String> {
        let verdict = match &self.policy {
            Some(policy) => policy.evaluate(action).await,
            None => PolicyVerdict::Allow,
        };

        if verdict.forces_gate() {
            return Some(format!("policy: {}", verdict.reason().unwrap_or_default()));
        }
        if let Some(reason) = verdict.reason() {
            warn!(action_id = %action.id, kind = %action.kind, %reason, "policy warning");
        }
        self.threshold_reason(action.risk)
    }

    fn threshold_reason(&self, risk: RiskLevel) -> Option<String> {
        if !self.config.requires_approval(risk) {
            return None;
        }
        self.config
            .approval_threshold
            .map(|threshold| format!("risk {risk} meets threshold {threshold}"))
    }

    /// Ask the handler. `Err` carries the block reason; every path except an
    /// explicit approval fails closed.
    async fn request_approval(&self, action: &Action) -> Result<(), String> {
        let Some(handler) = &self.approval else {
            return Err("no approval handler registered".to_owned());
        };
        if !handler.is_available() {
            return Err("approval handler unavailable".to_owned());
        }

        let decision = AssertUnwindSafe(handler.decide(action.clone())).catch_unwind();
        let response = match self.config.approval_timeout {
            Some(limit) => tokio::time::timeout(limit, decision)
                .await
                .map_err(|_| format!("approval timed out after {}s", limit.as_secs()))?,
            None => decision.await,
        };

        match response {
            Ok(Some(ApprovalDecision::Approve)) => Ok(()),
            Ok(Some(ApprovalDecision::Deny { reason })) => Err(reason),
            Ok(None) => Err("no approval decision received".to_owned()),
            Err(payload) => Err(format!(
                "approval handler panicked: {}",
                panic_message(payload.as_ref())
            )),
        }
    }

    async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, ExecutionError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let future = std::panic::catch_unwind(AssertUnwindSafe(operation))
            .map_err(|payload| ExecutionError::Panicked(panic_message(payload.as_ref())))?;

        let running = AssertUnwindSafe(future).catch_unwind();
        let finished = match self.config.execution_timeout {
            Some(limit) => tokio::time::timeout(limit, running)
                .await
                .map_err(|_| ExecutionError::TimedOut(limit))?,
            None => running.await,
        };

        match finished {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ExecutionError::Operation(e)),
            Err(payload) => Err(ExecutionError::Panicked(panic_message(payload.as_ref()))),
        }
    }

    async fn transition(&self, id: ActionId, update: ActionUpdate) -> GuardOpResult<Action> {
        let action = self.store.update(id, &update).await?;
        self.observers.notify(&action);
        Ok(action)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("config", &self.config)
            .field("classifier", &self.classifier)
            .field("approval_handler", &self.approval.is_some())
            .field("policy", &self.policy.is_some())
            .field("observers", &self.observers.len())
            .field("compensators", &self.undo.compensator_count())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

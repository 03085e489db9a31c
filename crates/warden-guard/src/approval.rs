//! Approval handlers: the human (or automated) decision on gated actions.
//!
//! The guard calls [`ApprovalHandler::decide`] once per gated action and
//! waits for the answer, bounded by the configured approval timeout. Any
//! outcome other than an explicit [`ApprovalDecision::Approve`] blocks the
//! action.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;
use warden_core::Action;

/// A decision on a gated action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Let the action run.
    Approve,
    /// Refuse the action.
    Deny {
        /// Reason shown in the blocked outcome.
        reason: String,
    },
}

impl ApprovalDecision {
    /// A denial with the given reason.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }
}

/// Source of approval decisions (CLI prompt, chat bot, policy service).
///
/// # Example
///
/// ```rust
/// use warden_core::Action;
/// use warden_guard::{ApprovalDecision, ApprovalHandler};
///
/// struct DenyPayments;
///
/// #[async_trait::async_trait]
/// impl ApprovalHandler for DenyPayments {
///     async fn decide(&self, action: Action) -> Option<ApprovalDecision> {
///         if action.kind.as_str() == "payment" {
///             Some(ApprovalDecision::deny("payments need a human"))
///         } else {
///             Some(ApprovalDecision::Approve)
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    /// Decide on a pending action. `None` means no decision was made.
    async fn decide(&self, action: Action) -> Option<ApprovalDecision>;

    /// Whether the handler can receive requests right now.
    fn is_available(&self) -> bool {
        true
    }
}

/// An approval request delivered through a [`ChannelApprovalHandler`].
#[derive(Debug)]
pub struct ApprovalPrompt {
    /// Snapshot of the pending action.
    pub action: Action,
    responder: oneshot::Sender<ApprovalDecision>,
}

impl ApprovalPrompt {
    /// Answer the prompt. Returns `false` if the guard stopped waiting.
    pub fn respond(self, decision: ApprovalDecision) -> bool {
        self.responder.send(decision).is_ok()
    }

    /// Approve the action.
    pub fn approve(self) -> bool {
        self.respond(ApprovalDecision::Approve)
    }

    /// Deny the action.
    pub fn deny(self, reason: impl Into<String>) -> bool {
        self.respond(ApprovalDecision::deny(reason))
    }
}

/// Delivers approval requests over a bounded tokio channel.
///
/// The receiving side answers each [`ApprovalPrompt`] through its oneshot
/// responder. Dropping a prompt unanswered counts as no decision.
#[derive(Debug, Clone)]
pub struct ChannelApprovalHandler {
    tx: mpsc::Sender<ApprovalPrompt>,
}

impl ChannelApprovalHandler {
    /// Create a handler and the receiver its prompts arrive on.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ApprovalPrompt>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ApprovalHandler for ChannelApprovalHandler {
    async fn decide(&self, action: Action) -> Option<ApprovalDecision> {
        let (responder, response) = oneshot::channel();
        let id = action.id;
        if self
            .tx
            .send(ApprovalPrompt { action, responder })
            .await
            .is_err()
        {
            warn!(action_id = %id, "approval receiver dropped");
            return None;
        }
        response.await.ok()
    }

    fn is_available(&self) -> bool {
        !self.tx.is_closed()
    }
}

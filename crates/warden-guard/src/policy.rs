//! Policy feed: verdicts from an external policy engine.
//!
//! A verdict never bypasses the approval gate. `Block` forces an action
//! through the gate regardless of its risk, `Warn` is logged, `Allow` leaves
//! the threshold decision alone.

use std::collections::HashMap;

use async_trait::async_trait;
use warden_core::{Action, ActionKind};

/// A policy engine's verdict on a captured action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PolicyVerdict {
    /// No objection.
    #[default]
    Allow,
    /// Proceed, but log the reason.
    Warn {
        /// Why the action is questionable.
        reason: String,
    },
    /// Require approval regardless of risk.
    Block {
        /// Why the action must be reviewed.
        reason: String,
    },
}

impl PolicyVerdict {
    /// Whether this verdict forces the approval gate.
    #[must_use]
    pub fn forces_gate(&self) -> bool {
        matches!(self, Self::Block { .. })
    }

    /// The verdict's reason, unless it is `Allow`.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Warn { reason } | Self::Block { reason } => Some(reason),
        }
    }
}

/// Source of policy verdicts.
#[async_trait]
pub trait PolicyFeed: Send + Sync {
    /// Evaluate a pending action.
    async fn evaluate(&self, action: &Action) -> PolicyVerdict;
}

/// Fixed verdicts keyed by action kind; unlisted kinds are allowed.
///
/// ```
/// use warden_core::ActionKind;
/// use warden_guard::StaticPolicy;
///
/// let policy = StaticPolicy::new()
///     .block(ActionKind::ShellCommand, "shell access is reviewed")
///     .warn(ActionKind::NetworkRequest, "outbound traffic");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticPolicy {
    verdicts: HashMap<ActionKind, PolicyVerdict>,
}

impl StaticPolicy {
    /// An empty policy that allows everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force every action of `kind` through the approval gate.
    #[must_use]
    pub fn block(mut self, kind: impl Into<ActionKind>, reason: impl Into<String>) -> Self {
        self.verdicts.insert(
            kind.into(),
            PolicyVerdict::Block {
                reason: reason.into(),
            },
        );
        self
    }

    /// Log a warning for every action of `kind`.
    #[must_use]
    pub fn warn(mut self, kind: impl Into<ActionKind>, reason: impl Into<String>) -> Self {
        self.verdicts.insert(
            kind.into(),
            PolicyVerdict::Warn {
                reason: reason.into(),
            },
        );
        self
    }

    /// Verdict for a kind.
    #[must_use]
    pub fn verdict_for(&self, kind: &ActionKind) -> PolicyVerdict {
        self.verdicts.get(kind).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PolicyFeed for StaticPolicy {
    async fn evaluate(&self, action: &Action) -> PolicyVerdict {
        self.verdict_for(&action.kind)
    }
}

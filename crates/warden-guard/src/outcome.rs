//! Result of a guarded call.

use warden_core::Action;

use crate::error::ExecutionError;

/// What happened to a guarded operation.
///
/// Exactly one of: never run, ran and produced a value, ran and failed.
#[derive(Debug)]
pub enum Outcome<T, E> {
    /// The gate refused the action; the operation was never invoked.
    Blocked {
        /// Denial reason, or why no decision could be obtained.
        reason: String,
    },
    /// The operation succeeded.
    Executed(T),
    /// The operation ran and failed.
    Failed(ExecutionError<E>),
}

/// A guarded call's final audit record and outcome.
#[derive(Debug)]
pub struct GuardResult<T, E> {
    /// The persisted record in its terminal state.
    pub action: Action,
    /// What happened to the operation.
    pub outcome: Outcome<T, E>,
}

impl<T, E> GuardResult<T, E> {
    /// Whether the action was blocked.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self.outcome, Outcome::Blocked { .. })
    }

    /// Whether the operation produced a value.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        matches!(self.outcome, Outcome::Executed(_))
    }

    /// Whether the operation ran and failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }

    /// The operation's value, if it produced one.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Executed(value) => Some(value),
            _ => None,
        }
    }

    /// The operation's value, discarding the record.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self.outcome {
            Outcome::Executed(value) => Some(value),
            _ => None,
        }
    }
}

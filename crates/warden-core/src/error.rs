//! Validation errors raised by the action model.

use thiserror::Error;

use crate::action::ActionStatus;

/// Errors raised when an action or an update violates the model's invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A status change that is not a valid successor of the current state.
    #[error("illegal transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: ActionStatus,
        /// Requested status.
        to: ActionStatus,
    },

    /// An update that touches a field outside the transition that owns it.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// A malformed action (empty description, non-object details, ...).
    #[error("invalid action: {field}: {message}")]
    Invalid {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A string could not be parsed into a model type.
    #[error("cannot parse {what} from '{value}'")]
    Parse {
        /// Type being parsed.
        what: &'static str,
        /// Input that failed.
        value: String,
    },
}

/// Result type for model validation.
pub type CoreResult<T> = Result<T, CoreError>;

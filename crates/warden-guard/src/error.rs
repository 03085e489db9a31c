//! Guard error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use warden_audit::AuditError;
use warden_core::{ActionId, CoreError};

/// Errors returned by the guard, its manual API and the undo coordinator.
///
/// Failures of the guarded operation itself are not errors here: they are
/// recorded as `failed` and reported through [`ExecutionError`].
#[derive(Debug, Error)]
pub enum GuardError {
    /// No action with this id exists.
    #[error("action not found: {0}")]
    NotFound(ActionId),

    /// The request or transition violates the action model.
    #[error("validation failed: {0}")]
    Validation(#[from] CoreError),

    /// The action was captured as irreversible.
    #[error("action {0} is not reversible")]
    NotReversible(ActionId),

    /// The action has already been undone.
    #[error("action {0} has already been undone")]
    AlreadyUndone(ActionId),

    /// The compensating operation failed; the record is unchanged.
    #[error("compensation failed for action {id}: {reason}")]
    Compensation {
        /// The action being undone.
        id: ActionId,
        /// Why the compensator failed.
        reason: String,
    },

    /// The audit store failed.
    #[error("audit store error: {0}")]
    Storage(#[source] AuditError),

    /// A configuration value cannot be used.
    #[error("invalid guard configuration for '{field}': {message}")]
    Config {
        /// Dotted config field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

impl From<AuditError> for GuardError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::NotFound(id) => Self::NotFound(id),
            AuditError::Validation(e) => Self::Validation(e),
            other => Self::Storage(other),
        }
    }
}

/// Result type for guard operations.
pub type GuardOpResult<T> = Result<T, GuardError>;

/// Why a guarded operation did not produce a value.
#[derive(Debug)]
pub enum ExecutionError<E> {
    /// The operation returned an error.
    Operation(E),
    /// The operation panicked.
    Panicked(String),
    /// The operation exceeded the execution timeout.
    TimedOut(Duration),
}

impl<E: fmt::Display> fmt::Display for ExecutionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(e) => write!(f, "{e}"),
            Self::Panicked(msg) => write!(f, "operation panicked: {msg}"),
            Self::TimedOut(after) => {
                write!(f, "operation timed out after {}ms", after.as_millis())
            },
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ExecutionError<E> {}

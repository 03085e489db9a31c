//! Audit store error types.

use thiserror::Error;
use warden_core::{ActionId, CoreError};
use warden_storage::StorageError;

/// Errors that can occur in the audit store.
#[derive(Debug, Error)]
pub enum AuditError {
    /// An action with this id is already recorded.
    #[error("action already recorded: {0}")]
    Duplicate(ActionId),

    /// No action with this id exists.
    #[error("action not found: {0}")]
    NotFound(ActionId),

    /// The record or update violates the action model.
    #[error("validation error: {0}")]
    Validation(#[from] CoreError),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// A persisted row could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<StorageError> for AuditError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Serialization(msg) => Self::Serialization(msg),
            other => Self::Storage(other),
        }
    }
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

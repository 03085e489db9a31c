//! The audit store contract.

use async_trait::async_trait;
use warden_core::{Action, ActionId, ActionUpdate, QueryFilter, StatsSnapshot};

use crate::error::AuditResult;

/// Durable persistence and query of action records.
///
/// The store is the single owner of persisted records. Every mutation after
/// capture goes through [`update`](ActionStore::update), and updates to the
/// same id are serialised so concurrent completions cannot overwrite each
/// other.
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Persist a freshly captured action.
    ///
    /// # Errors
    ///
    /// - [`AuditError::Duplicate`](crate::AuditError::Duplicate) if the id is
    ///   already recorded. Detection is atomic with the write.
    /// - [`AuditError::Validation`](crate::AuditError::Validation) if the
    ///   record is not a valid pending action.
    async fn insert(&self, action: &Action) -> AuditResult<()>;

    /// Apply an update to the mutable fields and return the new record.
    ///
    /// An empty update returns the current record unchanged.
    ///
    /// # Errors
    ///
    /// - [`AuditError::NotFound`](crate::AuditError::NotFound) for unknown ids.
    /// - [`AuditError::Validation`](crate::AuditError::Validation) for an
    ///   illegal transition or misplaced `result`/`error`.
    async fn update(&self, id: ActionId, update: &ActionUpdate) -> AuditResult<Action>;

    /// The current record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the row cannot be decoded.
    async fn get(&self, id: ActionId) -> AuditResult<Option<Action>>;

    /// Actions matching every predicate of `filter`, ordered and paginated.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or a row cannot be decoded.
    async fn query(&self, filter: &QueryFilter) -> AuditResult<Vec<Action>>;

    /// Totals grouped by risk, status and agent, computed at call time.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or a row cannot be decoded.
    async fn stats(&self) -> AuditResult<StatsSnapshot>;
}

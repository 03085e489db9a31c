//! Warden Audit - the durable, queryable record of agent actions.
//!
//! This crate provides:
//! - The [`ActionStore`] contract: insert, update, get, query, stats
//! - [`KvActionStore`], an implementation over any `warden_storage::KvStore`
//!   with secondary indexes on agent, kind, risk, status and capture time
//!
//! The store owns persisted records. Every change after capture goes through
//! [`ActionStore::update`], which validates the transition against the
//! action model and serialises concurrent writers per action id.
//!
//! # Example
//!
//! ```
//! use warden_audit::{ActionStore, KvActionStore};
//! use warden_core::{Action, ActionKind, ActionUpdate, NewAction, QueryFilter, RiskLevel};
//!
//! # async fn example() {
//! let store = KvActionStore::in_memory().unwrap();
//!
//! let action = Action::capture(
//!     NewAction::new(ActionKind::FileRead, "Read config").with_agent("indexer"),
//!     RiskLevel::Low,
//!     "unknown",
//! )
//! .unwrap();
//! store.insert(&action).await.unwrap();
//! store
//!     .update(action.id, &ActionUpdate::executed(serde_json::json!({"lines": 12})))
//!     .await
//!     .unwrap();
//!
//! let recent = store.query(&QueryFilter::new().agent("indexer")).await.unwrap();
//! assert_eq!(recent.len(), 1);
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod index;
mod kv_store;
mod store;

pub use error::{AuditError, AuditResult};
pub use kv_store::KvActionStore;
pub use store::ActionStore;

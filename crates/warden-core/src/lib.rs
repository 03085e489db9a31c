//! Warden Core - the action model shared by every Warden component.
//!
//! This crate provides:
//! - Identifier and timestamp types ([`ActionId`], [`Timestamp`])
//! - The ordered [`RiskLevel`] scale
//! - The [`Action`] record and its capture input [`NewAction`]
//! - The lifecycle state machine ([`ActionStatus`]) and the closed set of
//!   mutable fields ([`ActionUpdate`])
//! - Query and statistics types consumed by the audit store
//!
//! The model carries no behaviour beyond validation. Persistence, risk
//! scoring and execution live in `warden-audit`, `warden-risk` and
//! `warden-guard`.
//!
//! # Example
//!
//! ```
//! use warden_core::{Action, ActionKind, ActionStatus, ActionUpdate, NewAction, RiskLevel};
//!
//! let input = NewAction::new(ActionKind::FileWrite, "Write build cache")
//!     .with_agent("builder");
//! let mut action = Action::capture(input, RiskLevel::Medium, "unknown").unwrap();
//! assert_eq!(action.status, ActionStatus::Pending);
//! assert!(action.reversible);
//!
//! action
//!     .apply(&ActionUpdate::executed(serde_json::json!({"bytes": 42})))
//!     .unwrap();
//! assert_eq!(action.status, ActionStatus::Executed);
//!
//! // Terminal states cannot be revisited.
//! assert!(action.apply(&ActionUpdate::status(ActionStatus::Pending)).is_err());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod action;
pub mod error;
pub mod query;
pub mod types;

pub use action::{Action, ActionContext, ActionKind, ActionStatus, ActionUpdate, NewAction};
pub use error::{CoreError, CoreResult};
pub use query::{QueryFilter, SortOrder, StatsSnapshot};
pub use types::{ActionId, RiskLevel, Timestamp};

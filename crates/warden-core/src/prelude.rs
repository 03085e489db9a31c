//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{CoreError, CoreResult};

// Identity and ordering
pub use crate::{ActionId, RiskLevel, Timestamp};

// Action model
pub use crate::{Action, ActionContext, ActionKind, ActionStatus, ActionUpdate, NewAction};

// Queries
pub use crate::{QueryFilter, SortOrder, StatsSnapshot};

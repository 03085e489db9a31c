//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_audit::prelude::*;` to import all essential types.

pub use crate::{ActionStore, AuditError, AuditResult, KvActionStore};

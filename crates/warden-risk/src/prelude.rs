//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_risk::prelude::*;` to import all essential types.

pub use crate::{Escalation, PatternFamily, RiskAssessment, RiskClassifier, default_risk};

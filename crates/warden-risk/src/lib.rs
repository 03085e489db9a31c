//! Warden Risk - deterministic risk classification for agent actions.
//!
//! Classification is a pure function of an action's kind, description,
//! details and optional caller override:
//!
//! 1. An explicit override is returned unchanged.
//! 2. Otherwise the level starts from a per-kind default table.
//! 3. The description and serialized details are scanned for two pattern
//!    families, sensitive content and external communication. Each family
//!    that matches escalates the level by one step, capped at critical.
//!
//! # Example
//!
//! ```
//! use warden_core::{ActionKind, NewAction, RiskLevel};
//! use warden_risk::RiskClassifier;
//!
//! let classifier = RiskClassifier::new();
//!
//! let read = NewAction::new(ActionKind::FileRead, "Read project README");
//! assert_eq!(classifier.classify(&read), RiskLevel::Low);
//!
//! let shell = NewAction::new(ActionKind::ShellCommand, "export API_KEY=sk-live0123456789abcdef");
//! assert_eq!(classifier.classify(&shell), RiskLevel::Critical);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod classifier;
mod patterns;
mod table;

pub use classifier::{Escalation, RiskAssessment, RiskClassifier};
pub use patterns::PatternFamily;
pub use table::default_risk;

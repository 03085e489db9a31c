//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_guard::prelude::*;` to import all essential types.

// Errors
pub use crate::{ExecutionError, GuardError, GuardOpResult};

// Guard
pub use crate::{Guard, GuardBuilder, GuardConfig, GuardResult, Outcome};

// Extension points
pub use crate::{
    ActionObserver, ApprovalDecision, ApprovalHandler, Compensator, PolicyFeed, PolicyVerdict,
};

// Bundled implementations
pub use crate::{
    ApprovalPrompt, ChannelApprovalHandler, ChannelObserver, FileRestoreCompensator,
    FileSnapshot, StaticPolicy,
};

//! Warden Guard - runtime mediation of agent actions.
//!
//! Every action an agent attempts passes through a [`Guard`]:
//!
//! - its risk is classified (or taken from the caller / configured default)
//! - a `pending` record is written to the audit store before anything runs
//! - actions at or above the approval threshold, or blocked by the policy
//!   feed, wait for an [`ApprovalHandler`] decision; no decision means no
//!   execution
//! - the operation runs with panics caught and an optional time limit
//! - the terminal state is recorded and returned alongside the value
//!
//! Reversible actions can later be compensated through [`Guard::undo`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use warden_core::{ActionKind, NewAction};
//! use warden_guard::{ChannelApprovalHandler, Guard};
//!
//! # async fn example() {
//! let (handler, mut prompts) = ChannelApprovalHandler::new(8);
//! let guard = Guard::builder()
//!     .approval_handler(Arc::new(handler))
//!     .build()
//!     .unwrap();
//!
//! // A reviewer answering prompts elsewhere.
//! tokio::spawn(async move {
//!     while let Some(prompt) = prompts.recv().await {
//!         prompt.deny("emails are sent by humans");
//!     }
//! });
//!
//! let result = guard
//!     .guard(
//!         NewAction::new(ActionKind::EmailSend, "Send weekly report to ops@example.com"),
//!         || async { Ok::<_, String>(()) },
//!     )
//!     .await
//!     .unwrap();
//! assert!(result.is_blocked());
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod approval;
mod config;
mod error;
mod guard;
mod observer;
mod outcome;
mod policy;
mod undo;

pub use approval::{ApprovalDecision, ApprovalHandler, ApprovalPrompt, ChannelApprovalHandler};
pub use config::GuardConfig;
pub use error::{ExecutionError, GuardError, GuardOpResult};
pub use guard::{Guard, GuardBuilder};
pub use observer::{ActionObserver, ChannelObserver};
pub use outcome::{GuardResult, Outcome};
pub use policy::{PolicyFeed, PolicyVerdict, StaticPolicy};
pub use undo::{Compensator, FileRestoreCompensator, FileSnapshot};

//! The action record and its lifecycle.
//!
//! An [`Action`] is captured once from a [`NewAction`] and afterwards only
//! its `status`, `result` and `error` may change, and only through an
//! [`ActionUpdate`] that [`Action::apply`] validates against the state
//! machine:
//!
//! ```text
//! pending ──► approved ──► executed ──► undone
//!    │            │
//!    │            └──────► failed
//!    ├──► blocked
//!    ├──► executed        (not gated)
//!    └──► failed          (not gated)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::types::{ActionId, RiskLevel, Timestamp};

/// Category tag of an attempted action.
///
/// Persisted as its string tag (`"file.write"`, `"email.send"`, ...). Tags
/// outside the recognised set round-trip through [`ActionKind::Custom`].
/// Deserialization matches tags exactly; the lenient spellings accepted by
/// `From<&str>` are for caller input only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum ActionKind {
    /// Read a file.
    FileRead,
    /// Create or overwrite a file.
    FileWrite,
    /// Delete a file.
    FileDelete,
    /// Outbound network / API request.
    NetworkRequest,
    /// Send a chat or platform message.
    MessageSend,
    /// Send an email.
    EmailSend,
    /// Execute a shell command.
    ShellCommand,
    /// Move money.
    Payment,
    /// Change configuration or access settings.
    ConfigChange,
    /// Any other caller-defined tag.
    Custom(String),
}

impl ActionKind {
    /// Kind for an exact persisted tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "file.read" => Self::FileRead,
            "file.write" => Self::FileWrite,
            "file.delete" => Self::FileDelete,
            "network.request" => Self::NetworkRequest,
            "message.send" => Self::MessageSend,
            "email.send" => Self::EmailSend,
            "shell.command" => Self::ShellCommand,
            "payment" => Self::Payment,
            "config.change" => Self::ConfigChange,
            _ => Self::Custom(tag.to_owned()),
        }
    }

    /// The same kind with a custom tag that spells a known tag folded into
    /// its variant, so equality matches what the persisted form reads back as.
    #[must_use]
    pub fn canonical(self) -> Self {
        match self {
            Self::Custom(tag) => Self::from_tag(&tag),
            other => other,
        }
    }

    /// The persisted tag for this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::FileRead => "file.read",
            Self::FileWrite => "file.write",
            Self::FileDelete => "file.delete",
            Self::NetworkRequest => "network.request",
            Self::MessageSend => "message.send",
            Self::EmailSend => "email.send",
            Self::ShellCommand => "shell.command",
            Self::Payment => "payment",
            Self::ConfigChange => "config.change",
            Self::Custom(tag) => tag,
        }
    }

    /// Whether actions of this kind can be compensated by default.
    ///
    /// Local state changes are reversible; anything that leaves the process
    /// (messages, payments, commands) is not.
    #[must_use]
    pub fn default_reversible(&self) -> bool {
        matches!(self, Self::FileWrite | Self::FileDelete | Self::ConfigChange)
    }

    /// Whether this is a caller-defined tag.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ActionKind {
    fn from(tag: &str) -> Self {
        // Accept `file-write` and `file_write` spellings of the known tags.
        let normalized = tag.trim().to_ascii_lowercase().replace(['-', '_'], ".");
        match normalized.as_str() {
            "file.read" => Self::FileRead,
            "file.write" => Self::FileWrite,
            "file.delete" => Self::FileDelete,
            "network.request" => Self::NetworkRequest,
            "message.send" => Self::MessageSend,
            "email.send" => Self::EmailSend,
            "shell.command" | "command.execute" => Self::ShellCommand,
            "payment" => Self::Payment,
            "config.change" => Self::ConfigChange,
            _ => Self::Custom(tag.to_owned()),
        }
    }
}

impl From<String> for ActionKind {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Custom(tag) => tag,
            other => other.as_str().to_owned(),
        }
    }
}

impl FromStr for ActionKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Lifecycle state of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Captured, not yet decided.
    Pending,
    /// Cleared by an approval decision.
    Approved,
    /// Denied; the operation never ran.
    Blocked,
    /// The operation completed.
    Executed,
    /// The operation returned an error.
    Failed,
    /// A completed action that has since been compensated.
    Undone,
}

impl ActionStatus {
    /// Every status in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Approved,
        Self::Blocked,
        Self::Executed,
        Self::Failed,
        Self::Undone,
    ];

    /// Whether `next` is a valid successor of `self`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Pending,
                Self::Approved | Self::Blocked | Self::Executed | Self::Failed
            ) | (Self::Approved, Self::Executed | Self::Failed)
                | (Self::Executed, Self::Undone)
        )
    }

    /// Whether the guard pipeline is finished with an action in this state.
    #[must_use]
    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Pending | Self::Approved)
    }

    /// Stable lowercase label, also used as the persisted form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Blocked => "blocked",
            Self::Executed => "executed",
            Self::Failed => "failed",
            Self::Undone => "undone",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::Parse {
                what: "action status",
                value: s.to_owned(),
            })
    }
}

/// Provenance of an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext {
    /// Session the action belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Conversational turn that produced the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<String>,
    /// The agent's stated reasoning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Parent action, for nested or derived actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ActionId>,
}

impl ActionContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session id.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the originating turn.
    #[must_use]
    pub fn with_turn(mut self, turn: impl Into<String>) -> Self {
        self.turn = Some(turn.into());
        self
    }

    /// Set the agent's reasoning.
    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Set the parent action.
    #[must_use]
    pub fn with_parent(mut self, parent_id: ActionId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Whether no provenance was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.session_id.is_none()
            && self.turn.is_none()
            && self.reasoning.is_none()
            && self.parent_id.is_none()
    }
}

/// Capture input: what the caller knows about an attempted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAction {
    /// Category tag.
    pub kind: ActionKind,
    /// Human-readable summary.
    pub description: String,
    /// Originating actor; the configured fallback is used when absent.
    #[serde(default)]
    pub agent: Option<String>,
    /// Action-specific metadata.
    #[serde(default)]
    pub details: Map<String, Value>,
    /// Explicit risk; bypasses classification when set.
    #[serde(default)]
    pub risk: Option<RiskLevel>,
    /// Provenance.
    #[serde(default)]
    pub context: ActionContext,
    /// Explicit reversibility; derived from `kind` when absent.
    #[serde(default)]
    pub reversible: Option<bool>,
    /// Payload the undo mechanism needs.
    #[serde(default)]
    pub undo_data: Option<Value>,
}

impl NewAction {
    /// Describe a new action of the given kind.
    #[must_use]
    pub fn new(kind: impl Into<ActionKind>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            agent: None,
            details: Map::new(),
            risk: None,
            context: ActionContext::default(),
            reversible: None,
            undo_data: None,
        }
    }

    /// Set the originating agent.
    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Add a single detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Replace all details.
    #[must_use]
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = details;
        self
    }

    /// Override the risk level.
    #[must_use]
    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = Some(risk);
        self
    }

    /// Attach provenance.
    #[must_use]
    pub fn with_context(mut self, context: ActionContext) -> Self {
        self.context = context;
        self
    }

    /// Override reversibility.
    #[must_use]
    pub fn with_reversible(mut self, reversible: bool) -> Self {
        self.reversible = Some(reversible);
        self
    }

    /// Attach the undo payload.
    #[must_use]
    pub fn with_undo_data(mut self, undo_data: Value) -> Self {
        self.undo_data = Some(undo_data);
        self
    }
}

/// The closed set of fields that may change after capture.
///
/// An empty update is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionUpdate {
    /// New lifecycle state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ActionStatus>,
    /// Operation result; only with the `executed` transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Operation error; only with the `failed` transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionUpdate {
    /// A bare status change.
    #[must_use]
    pub fn status(status: ActionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Transition to `executed` with a result.
    #[must_use]
    pub fn executed(result: Value) -> Self {
        Self {
            status: Some(ActionStatus::Executed),
            result: Some(result),
            error: None,
        }
    }

    /// Transition to `failed` with an error.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(ActionStatus::Failed),
            result: None,
            error: Some(error.into()),
        }
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.result.is_none() && self.error.is_none()
    }
}

/// A captured action: the unit of audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier.
    pub id: ActionId,
    /// Capture time.
    pub timestamp: Timestamp,
    /// Originating actor.
    pub agent: String,
    /// Category tag.
    pub kind: ActionKind,
    /// Human-readable summary.
    pub description: String,
    /// Action-specific metadata, stored verbatim.
    pub details: Map<String, Value>,
    /// Risk level assigned at capture.
    pub risk: RiskLevel,
    /// Current lifecycle state.
    pub status: ActionStatus,
    /// Provenance.
    #[serde(default)]
    pub context: ActionContext,
    /// Whether the action can be compensated.
    pub reversible: bool,
    /// Payload for the undo mechanism.
    #[serde(default)]
    pub undo_data: Option<Value>,
    /// Operation result, once executed.
    #[serde(default)]
    pub result: Option<Value>,
    /// Operation error, once failed.
    #[serde(default)]
    pub error: Option<String>,
}

impl Action {
    /// Build a pending action from capture input.
    ///
    /// `risk` is the already-resolved level; `default_agent` fills in a
    /// missing or blank agent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Invalid`] if the description is blank, a custom
    /// kind has an empty tag, or the agent or kind contains a null byte.
    pub fn capture(input: NewAction, risk: RiskLevel, default_agent: &str) -> CoreResult<Self> {
        let agent = input
            .agent
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| default_agent.to_owned());
        let kind = input.kind.canonical();
        let reversible = input
            .reversible
            .unwrap_or_else(|| kind.default_reversible());

        let action = Self {
            id: ActionId::new(),
            timestamp: Timestamp::now(),
            agent,
            kind,
            description: input.description,
            details: input.details,
            risk,
            status: ActionStatus::Pending,
            context: input.context,
            reversible,
            undo_data: input.undo_data,
            result: None,
            error: None,
        };
        action.validate_new()?;
        Ok(action)
    }

    /// Check the invariants of a freshly captured record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Invalid`] describing the first violation.
    pub fn validate_new(&self) -> CoreResult<()> {
        if self.description.trim().is_empty() {
            return Err(invalid("description", "must not be empty"));
        }
        if self.agent.trim().is_empty() {
            return Err(invalid("agent", "must not be empty"));
        }
        if self.kind.as_str().trim().is_empty() {
            return Err(invalid("kind", "custom tag must not be empty"));
        }
        // Agent and kind name index namespaces.
        if self.agent.contains('\0') {
            return Err(invalid("agent", "must not contain null bytes"));
        }
        if self.kind.as_str().contains('\0') {
            return Err(invalid("kind", "must not contain null bytes"));
        }
        if self.status != ActionStatus::Pending {
            return Err(invalid(
                "status",
                &format!("new actions start as pending, got {}", self.status),
            ));
        }
        if self.result.is_some() || self.error.is_some() {
            return Err(invalid("result", "new actions carry no outcome"));
        }
        if self.context.parent_id == Some(self.id) {
            return Err(invalid("context.parent_id", "action cannot be its own parent"));
        }
        Ok(())
    }

    /// Apply a validated update in place.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidTransition`] if the status is not a successor.
    /// - [`CoreError::InvalidUpdate`] if `result`/`error` accompany the wrong
    ///   transition or would be written twice.
    pub fn apply(&mut self, update: &ActionUpdate) -> CoreResult<()> {
        if update.is_empty() {
            return Ok(());
        }

        if update.result.is_some() && update.status != Some(ActionStatus::Executed) {
            return Err(CoreError::InvalidUpdate(
                "result may only be set on the executed transition".to_owned(),
            ));
        }
        if update.error.is_some() && update.status != Some(ActionStatus::Failed) {
            return Err(CoreError::InvalidUpdate(
                "error may only be set on the failed transition".to_owned(),
            ));
        }
        if (update.result.is_some() && self.result.is_some())
            || (update.error.is_some() && self.error.is_some())
        {
            return Err(CoreError::InvalidUpdate(
                "result and error are write-once".to_owned(),
            ));
        }

        if let Some(next) = update.status {
            if !self.status.can_transition_to(next) {
                return Err(CoreError::InvalidTransition {
                    from: self.status,
                    to: next,
                });
            }
            self.status = next;
        }
        if let Some(result) = &update.result {
            self.result = Some(result.clone());
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }
        Ok(())
    }

    /// Whether the action can currently be undone.
    #[must_use]
    pub fn is_undoable(&self) -> bool {
        self.reversible && self.status == ActionStatus::Executed
    }
}

fn invalid(field: &str, message: &str) -> CoreError {
    CoreError::Invalid {
        field: field.to_owned(),
        message: message.to_owned(),
    }
}

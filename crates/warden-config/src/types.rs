//! Configuration types for Warden.
//!
//! These types carry no dependency on other Warden crates. Risk levels and
//! backends are plain strings here and are parsed into domain types at the
//! boundary (`warden-guard`, `warden-telemetry`). Every struct implements
//! [`Default`] matching `defaults.toml`, so a bare `[section]` header yields
//! a working configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Guard pipeline behaviour: classification, gating, timeouts.
    pub guard: GuardSection,
    /// Audit store backend.
    pub audit: AuditSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// GuardSection
// ---------------------------------------------------------------------------

/// Guard pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSection {
    /// Agent recorded when a request does not name one.
    pub default_agent: String,
    /// Whether to classify risk automatically.
    pub auto_classify: bool,
    /// Risk used when classification is disabled and the request has none.
    pub default_risk: String,
    /// Lowest risk level that requires approval. `None` or `"none"` disables
    /// gating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_threshold: Option<String>,
    /// Seconds to wait for an approval decision; 0 waits indefinitely.
    pub approval_timeout_secs: u64,
    /// Seconds a guarded operation may run; 0 disables the limit.
    pub execution_timeout_secs: u64,
}

impl Default for GuardSection {
    fn default() -> Self {
        Self {
            default_agent: "unknown".to_owned(),
            auto_classify: true,
            default_risk: "medium".to_owned(),
            approval_threshold: Some("high".to_owned()),
            approval_timeout_secs: 300,
            execution_timeout_secs: 0,
        }
    }
}

impl GuardSection {
    /// The configured threshold, with `"none"`/`"off"` treated as unset.
    #[must_use]
    pub fn threshold(&self) -> Option<&str> {
        self.approval_threshold
            .as_deref()
            .map(str::trim)
            .filter(|t| {
                !t.is_empty() && !t.eq_ignore_ascii_case("none") && !t.eq_ignore_ascii_case("off")
            })
    }
}

// ---------------------------------------------------------------------------
// AuditSection
// ---------------------------------------------------------------------------

/// Audit store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// `"memory"` or `"surrealkv"`.
    pub backend: String,
    /// Storage directory for durable backends. Relative paths resolve
    /// against the workspace root.
    pub path: String,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            backend: "memory".to_owned(),
            path: ".warden/audit".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["warden_audit=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

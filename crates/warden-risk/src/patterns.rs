//! Content patterns that escalate an action's risk.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// A named group of patterns. Each matching family escalates risk once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFamily {
    /// Credentials, secrets and privileged-execution markers.
    SensitiveContent,
    /// Addresses that reach outside the system: email, URLs, phone numbers.
    ExternalCommunication,
}

impl PatternFamily {
    /// Every family, in evaluation order.
    pub const ALL: [Self; 2] = [Self::SensitiveContent, Self::ExternalCommunication];

    /// Stable label used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SensitiveContent => "sensitive_content",
            Self::ExternalCommunication => "external_communication",
        }
    }

    /// Name of the first pattern in this family that matches `text`.
    #[must_use]
    pub fn first_match(&self, text: &str) -> Option<&'static str> {
        let patterns: &[(&'static str, Regex)] = match self {
            Self::SensitiveContent => SENSITIVE.as_slice(),
            Self::ExternalCommunication => EXTERNAL.as_slice(),
        };
        patterns
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(name, _)| *name)
    }
}

impl fmt::Display for PatternFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compile(table: &[(&'static str, &str)]) -> Vec<(&'static str, Regex)> {
    table
        .iter()
        .map(|(name, pattern)| (*name, Regex::new(pattern).expect("invalid regex")))
        .collect()
}

static SENSITIVE: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    compile(&[
        ("openai_key", r"\bsk-[A-Za-z0-9_\-]{16,}"),
        ("github_token", r"\b(ghp|gho|ghu|ghs|ghr)_[A-Za-z0-9]{20,}"),
        ("aws_access_key", r"\bAKIA[0-9A-Z]{16}\b"),
        (
            "bearer_jwt",
            r"(?i)\bbearer\s+[A-Za-z0-9_\-]+\.[A-Za-z0-9_\-]+\.[A-Za-z0-9_\-]+",
        ),
        ("pem_private_key", r"-----BEGIN [A-Z ]*PRIVATE KEY-----"),
        (
            "credential_keyword",
            r"(?i)\b(password|passwd|pwd|secret|api[_\-\s]?key|apikey|access[_\-\s]?token|auth[_\-\s]?token|token|credential|private[_\-\s]?key)s?\b",
        ),
        (
            "privileged_execution",
            r"(?i)(\bsudo\b|\brm\s+-[a-z]*r[a-z]*f|\brm\s+-[a-z]*f[a-z]*r|\bchmod\s+777\b|\bsu\s+root\b)",
        ),
    ])
});

static EXTERNAL: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    compile(&[
        ("email_address", r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}"),
        ("url", r"(?i)\bhttps?://[^\s]+"),
        (
            "phone_number",
            r"(?:\+\d{1,3}[\s.\-]?)?\(?\b\d{3}\)?[\s.\-]?\d{3}[\s.\-]?\d{4}\b",
        ),
    ])
});

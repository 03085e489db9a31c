//! Guard settings and the bridge from `warden_config`.

use std::time::Duration;

use warden_config::GuardSection;
use warden_core::RiskLevel;

use crate::error::GuardError;

/// Runtime settings of a [`Guard`](crate::Guard).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Agent recorded when a request names none.
    pub default_agent: String,
    /// Classify risk from kind and content. When off, requests without an
    /// explicit risk get `default_risk`.
    pub auto_classify: bool,
    /// Risk for unclassified requests.
    pub default_risk: RiskLevel,
    /// Lowest risk that requires approval; `None` disables gating.
    pub approval_threshold: Option<RiskLevel>,
    /// Bound on waiting for an approval decision; `None` waits indefinitely.
    pub approval_timeout: Option<Duration>,
    /// Bound on the guarded operation; `None` disables it.
    pub execution_timeout: Option<Duration>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            default_agent: "unknown".to_owned(),
            auto_classify: true,
            default_risk: RiskLevel::Medium,
            approval_threshold: Some(RiskLevel::High),
            approval_timeout: Some(Duration::from_secs(300)),
            execution_timeout: None,
        }
    }
}

impl GuardConfig {
    /// Set the fallback agent.
    #[must_use]
    pub fn with_default_agent(mut self, agent: impl Into<String>) -> Self {
        self.default_agent = agent.into();
        self
    }

    /// Set or clear the approval threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: Option<RiskLevel>) -> Self {
        self.approval_threshold = threshold;
        self
    }

    /// Set or clear the approval timeout.
    #[must_use]
    pub fn with_approval_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.approval_timeout = timeout;
        self
    }

    /// Set or clear the execution timeout.
    #[must_use]
    pub fn with_execution_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.execution_timeout = timeout;
        self
    }

    /// Disable classification; unrated requests get `default_risk`.
    #[must_use]
    pub fn without_classification(mut self, default_risk: RiskLevel) -> Self {
        self.auto_classify = false;
        self.default_risk = default_risk;
        self
    }

    /// Whether an action at `risk` must be approved before it runs.
    #[must_use]
    pub fn requires_approval(&self, risk: RiskLevel) -> bool {
        self.approval_threshold.is_some_and(|t| risk >= t)
    }
}

fn parse_risk(field: &str, value: &str) -> Result<RiskLevel, GuardError> {
    value.parse().map_err(|_| GuardError::Config {
        field: field.to_owned(),
        message: format!("unknown risk level '{value}'"),
    })
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl TryFrom<&GuardSection> for GuardConfig {
    type Error = GuardError;

    fn try_from(section: &GuardSection) -> Result<Self, Self::Error> {
        let approval_threshold = section
            .threshold()
            .map(|t| parse_risk("guard.approval_threshold", t))
            .transpose()?;

        Ok(Self {
            default_agent: section.default_agent.clone(),
            auto_classify: section.auto_classify,
            default_risk: parse_risk("guard.default_risk", &section.default_risk)?,
            approval_threshold,
            approval_timeout: seconds(section.approval_timeout_secs),
            execution_timeout: seconds(section.execution_timeout_secs),
        })
    }
}

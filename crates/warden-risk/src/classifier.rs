//! The risk classifier.

use serde_json::{Map, Value};
use std::collections::HashMap;

use warden_core::{ActionKind, NewAction, RiskLevel};

use crate::patterns::PatternFamily;
use crate::table::default_risk;

/// One escalation step applied during classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    /// Family that matched.
    pub family: PatternFamily,
    /// Name of the first matching pattern in that family.
    pub pattern: &'static str,
}

/// How a risk level was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    /// Final level.
    pub level: RiskLevel,
    /// Level before any content escalation.
    pub base: RiskLevel,
    /// Escalations applied, in family order.
    pub escalations: Vec<Escalation>,
    /// Whether the caller supplied the level explicitly.
    pub overridden: bool,
}

impl RiskAssessment {
    fn overridden(level: RiskLevel) -> Self {
        Self {
            level,
            base: level,
            escalations: Vec::new(),
            overridden: true,
        }
    }

    /// Whether content patterns raised the level above its base.
    #[must_use]
    pub fn escalated(&self) -> bool {
        self.level > self.base
    }
}

/// Assigns a [`RiskLevel`] to an action.
///
/// Deterministic: the same kind, description, details and override always
/// produce the same level.
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    kind_defaults: HashMap<ActionKind, RiskLevel>,
}

impl RiskClassifier {
    /// Create a classifier using the built-in default table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the baseline level for one kind.
    #[must_use]
    pub fn with_kind_default(mut self, kind: impl Into<ActionKind>, level: RiskLevel) -> Self {
        self.kind_defaults.insert(kind.into(), level);
        self
    }

    /// Baseline level for a kind, before content escalation.
    #[must_use]
    pub fn base_risk(&self, kind: &ActionKind) -> RiskLevel {
        self.kind_defaults
            .get(kind)
            .copied()
            .unwrap_or_else(|| default_risk(kind))
    }

    /// Classify a capture request.
    #[must_use]
    pub fn classify(&self, action: &NewAction) -> RiskLevel {
        self.assess(action).level
    }

    /// Classify a capture request, keeping the reasoning.
    #[must_use]
    pub fn assess(&self, action: &NewAction) -> RiskAssessment {
        self.assess_parts(
            &action.kind,
            &action.description,
            &action.details,
            action.risk,
        )
    }

    /// Classify from individual fields.
    #[must_use]
    pub fn assess_parts(
        &self,
        kind: &ActionKind,
        description: &str,
        details: &Map<String, Value>,
        risk_override: Option<RiskLevel>,
    ) -> RiskAssessment {
        if let Some(level) = risk_override {
            return RiskAssessment::overridden(level);
        }

        let base = self.base_risk(kind);
        let text = scan_text(description, details);

        let escalations: Vec<Escalation> = PatternFamily::ALL
            .into_iter()
            .filter_map(|family| {
                family
                    .first_match(&text)
                    .map(|pattern| Escalation { family, pattern })
            })
            .collect();

        let level = escalations
            .iter()
            .fold(base, |level, _| level.escalate());

        RiskAssessment {
            level,
            base,
            escalations,
            overridden: false,
        }
    }
}

fn scan_text(description: &str, details: &Map<String, Value>) -> String {
    if details.is_empty() {
        return description.to_owned();
    }
    // A `Map` always serializes; fall back to the description alone if not.
    match serde_json::to_string(details) {
        Ok(json) => format!("{description} {json}"),
        Err(_) => description.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(kind: ActionKind, description: &str) -> RiskLevel {
        RiskClassifier::new().classify(&NewAction::new(kind, description))
    }

    #[test]
    fn test_plain_actions_use_table() {
        assert_eq!(classify(ActionKind::FileRead, "Read README.md"), RiskLevel::Low);
        assert_eq!(classify(ActionKind::FileWrite, "Write notes.txt"), RiskLevel::Medium);
        assert_eq!(classify(ActionKind::Payment, "Pay invoice 42"), RiskLevel::Critical);
    }

    #[test]
    fn test_override_wins() {
        let action = NewAction::new(ActionKind::Payment, "Pay bob@example.com")
            .with_risk(RiskLevel::Low);
        let assessment = RiskClassifier::new().assess(&action);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.overridden);
        assert!(assessment.escalations.is_empty());
    }

    #[test]
    fn test_sensitive_content_escalates_once() {
        let assessment = RiskClassifier::new().assess(&NewAction::new(
            ActionKind::FileRead,
            "Read the password file",
        ));
        assert_eq!(assessment.base, RiskLevel::Low);
        assert_eq!(assessment.level, RiskLevel::Medium);
        assert_eq!(assessment.escalations.len(), 1);
        assert_eq!(
            assessment.escalations[0].family,
            PatternFamily::SensitiveContent
        );
    }

    #[test]
    fn test_both_families_stack() {
        let action = NewAction::new(ActionKind::FileRead, "Read token for alice@example.com");
        let assessment = RiskClassifier::new().assess(&action);
        assert_eq!(assessment.level, RiskLevel::High);
        assert_eq!(assessment.escalations.len(), 2);
        assert!(assessment.escalated());
    }

    #[test]
    fn test_escalation_capped_at_critical() {
        let action = NewAction::new(
            ActionKind::EmailSend,
            "Send api key sk-abcdefghijklmnopqrst to ops@example.com",
        );
        assert_eq!(RiskClassifier::new().classify(&action), RiskLevel::Critical);
    }

    #[test]
    fn test_details_are_scanned() {
        let action = NewAction::new(ActionKind::NetworkRequest, "Call the API")
            .with_detail("url", "https://api.example.org/v1/items");
        assert_eq!(RiskClassifier::new().classify(&action), RiskLevel::High);
    }

    #[test]
    fn test_email_send_is_critical() {
        let action = NewAction::new(ActionKind::EmailSend, "Send weekly report")
            .with_detail("to", "team@example.com");
        assert_eq!(RiskClassifier::new().classify(&action), RiskLevel::Critical);
    }

    #[test]
    fn test_shell_command_with_credential_is_critical() {
        let action = NewAction::new(ActionKind::ShellCommand, "Configure deploy credentials")
            .with_detail("command", "export GITHUB_TOKEN=ghp_abcdefghijklmnopqrstuvwx1234");
        let assessment = RiskClassifier::new().assess(&action);
        assert_eq!(assessment.base, RiskLevel::High);
        assert_eq!(assessment.level, RiskLevel::Critical);
    }

    #[test]
    fn test_deterministic() {
        let classifier = RiskClassifier::new();
        let action = NewAction::new(ActionKind::MessageSend, "Ping +1 555 010 9999")
            .with_detail("channel", json!({"id": 7, "name": "ops"}));
        let first = classifier.assess(&action);
        for _ in 0..10 {
            assert_eq!(classifier.assess(&action), first);
        }
    }

    #[test]
    fn test_kind_default_override() {
        let classifier =
            RiskClassifier::new().with_kind_default("crm.sync", RiskLevel::High);
        let action = NewAction::new("crm.sync", "Sync contacts");
        assert_eq!(classifier.classify(&action), RiskLevel::High);
        assert_eq!(
            classifier.base_risk(&ActionKind::Custom("other".to_string())),
            RiskLevel::Medium
        );
    }
}

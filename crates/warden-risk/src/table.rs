//! Baseline risk per action kind.

use warden_core::{ActionKind, RiskLevel};

/// Get the default risk level for an action kind.
///
/// This provides a baseline; the classifier may escalate it based on the
/// action's content. Unrecognised kinds start at medium.
#[must_use]
pub fn default_risk(kind: &ActionKind) -> RiskLevel {
    match kind {
        ActionKind::EmailSend | ActionKind::Payment => RiskLevel::Critical,
        ActionKind::FileDelete
        | ActionKind::ShellCommand
        | ActionKind::MessageSend
        | ActionKind::ConfigChange => RiskLevel::High,
        ActionKind::FileWrite | ActionKind::NetworkRequest | ActionKind::Custom(_) => {
            RiskLevel::Medium
        },
        ActionKind::FileRead => RiskLevel::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_risk_levels() {
        assert_eq!(default_risk(&ActionKind::FileRead), RiskLevel::Low);
        assert_eq!(default_risk(&ActionKind::FileWrite), RiskLevel::Medium);
        assert_eq!(default_risk(&ActionKind::ShellCommand), RiskLevel::High);
        assert_eq!(default_risk(&ActionKind::FileDelete), RiskLevel::High);
        assert_eq!(default_risk(&ActionKind::EmailSend), RiskLevel::Critical);
        assert_eq!(default_risk(&ActionKind::Payment), RiskLevel::Critical);
    }

    #[test]
    fn test_unknown_kind_is_medium() {
        assert_eq!(
            default_risk(&ActionKind::Custom("crm.sync".to_string())),
            RiskLevel::Medium
        );
    }
}

//! Loading a layered configuration and turning it into a running guard and
//! a logging setup.

mod common;

use common::RecordingHandler;
use warden_config::{Config, ConfigLayer};
use warden_core::{ActionKind, NewAction, RiskLevel};
use warden_guard::{GuardBuilder, GuardConfig};
use warden_telemetry::{LogConfig, LogFormat};

fn write(dir: &std::path::Path, body: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("config.toml"), body).unwrap();
}

#[tokio::test]
async fn test_workspace_config_drives_the_guard() {
    let home = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    write(
        home.path(),
        r#"
        [guard]
        default_agent = "assistant"
        approval_threshold = "critical"

        [logging]
        format = "json"
        directives = ["warden_guard=debug"]
    "#,
    );
    write(
        &workspace.path().join(".warden"),
        r#"
        [guard]
        approval_threshold = "medium"
        approval_timeout_secs = 30
    "#,
    );

    let resolved = Config::load_with_home(Some(workspace.path()), home.path()).unwrap();
    assert_eq!(
        resolved.field_sources.get("guard.approval_threshold"),
        Some(&ConfigLayer::Workspace)
    );

    let handler = RecordingHandler::denying("workspace policy");
    let guard = GuardBuilder::from_config(&resolved.config, Some(workspace.path()))
        .unwrap()
        .approval_handler(handler.clone())
        .build()
        .unwrap();
    assert_eq!(guard.config().approval_threshold, Some(RiskLevel::Medium));
    assert_eq!(guard.config().default_agent, "assistant");

    // Medium risk is now gated.
    let result = guard
        .guard(NewAction::new(ActionKind::FileWrite, "Write notes"), || async {
            Ok::<_, String>(())
        })
        .await
        .unwrap();
    assert!(result.is_blocked());
    assert_eq!(result.action.agent, "assistant");
    assert_eq!(handler.calls(), 1);

    let logging = LogConfig::from(&resolved.config.logging);
    assert_eq!(logging.format, LogFormat::Json);
    assert_eq!(logging.directives, vec!["warden_guard=debug"]);
}

#[test]
fn test_default_config_bridges_to_default_guard() {
    let home = tempfile::tempdir().unwrap();
    let resolved = Config::load_with_home(None, home.path()).unwrap();
    let guard_config = GuardConfig::try_from(&resolved.config.guard).unwrap();
    assert_eq!(guard_config, GuardConfig::default());
    assert!(resolved.loaded_files.is_empty());
}

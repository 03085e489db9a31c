//! Deep merge of TOML layers with per-field source tracking.
//!
//! The merge works on raw [`toml::Value`] trees rather than deserialized
//! structs, so a key missing from an overlay never resets the base value.

use std::collections::HashMap;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// User-level configuration (`~/.warden/config.toml`).
    User,
    /// Workspace-level configuration (`{workspace}/.warden/config.toml`).
    Workspace,
    /// `WARDEN_*` environment variable.
    Environment,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::User => write!(f, "user (~/.warden/config.toml)"),
            Self::Workspace => write!(f, "workspace (.warden/config.toml)"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Tracks which layer set each dotted field path.
pub type FieldSources = HashMap<String, ConfigLayer>;

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Deep-merge `overlay` into `base`, recording which layer set each leaf.
///
/// Tables merge per key; scalars and arrays from the overlay replace the
/// base value.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join_path(prefix, key);
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_leaves(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            record_leaves(overlay, prefix, layer, sources);
        },
    }
}

/// Record every leaf path under `val` as set by `layer`.
pub fn record_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join_path(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_overlay_replaces_scalars_and_keeps_siblings() {
        let mut base = parse(
            r#"
            [guard]
            default_agent = "unknown"
            approval_timeout_secs = 300
        "#,
        );
        let overlay = parse(
            r"
            [guard]
            approval_timeout_secs = 30
        ",
        );
        let mut sources = FieldSources::new();
        deep_merge_tracking(&mut base, &overlay, "", ConfigLayer::User, &mut sources);

        assert_eq!(base["guard"]["approval_timeout_secs"].as_integer(), Some(30));
        assert_eq!(base["guard"]["default_agent"].as_str(), Some("unknown"));
        assert_eq!(
            sources.get("guard.approval_timeout_secs"),
            Some(&ConfigLayer::User)
        );
        assert!(!sources.contains_key("guard.default_agent"));
    }

    #[test]
    fn test_new_tables_are_tracked() {
        let mut base = parse("");
        let overlay = parse(
            r#"
            [audit]
            backend = "surrealkv"
        "#,
        );
        let mut sources = FieldSources::new();
        deep_merge_tracking(
            &mut base,
            &overlay,
            "",
            ConfigLayer::Workspace,
            &mut sources,
        );
        assert_eq!(base["audit"]["backend"].as_str(), Some("surrealkv"));
        assert_eq!(sources.get("audit.backend"), Some(&ConfigLayer::Workspace));
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse(r#"directives = ["a=debug"]"#);
        let overlay = parse(r#"directives = ["b=warn"]"#);
        let mut sources = FieldSources::new();
        deep_merge_tracking(&mut base, &overlay, "", ConfigLayer::User, &mut sources);
        let directives = base["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].as_str(), Some("b=warn"));
    }
}

//! `WARDEN_*` environment variable resolution.
//!
//! Environment variables take precedence over the embedded defaults but
//! never over a value set in a config file.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Kind of TOML value an environment variable is coerced into.
#[derive(Debug, Clone, Copy)]
enum FieldType {
    String,
    Integer,
    Boolean,
}

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    field_type: FieldType,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "WARDEN_DEFAULT_AGENT",
        field_path: "guard.default_agent",
        field_type: FieldType::String,
    },
    EnvMapping {
        var_name: "WARDEN_AUTO_CLASSIFY",
        field_path: "guard.auto_classify",
        field_type: FieldType::Boolean,
    },
    EnvMapping {
        var_name: "WARDEN_DEFAULT_RISK",
        field_path: "guard.default_risk",
        field_type: FieldType::String,
    },
    EnvMapping {
        var_name: "WARDEN_APPROVAL_THRESHOLD",
        field_path: "guard.approval_threshold",
        field_type: FieldType::String,
    },
    EnvMapping {
        var_name: "WARDEN_APPROVAL_TIMEOUT_SECS",
        field_path: "guard.approval_timeout_secs",
        field_type: FieldType::Integer,
    },
    EnvMapping {
        var_name: "WARDEN_EXECUTION_TIMEOUT_SECS",
        field_path: "guard.execution_timeout_secs",
        field_type: FieldType::Integer,
    },
    EnvMapping {
        var_name: "WARDEN_AUDIT_BACKEND",
        field_path: "audit.backend",
        field_type: FieldType::String,
    },
    EnvMapping {
        var_name: "WARDEN_AUDIT_PATH",
        field_path: "audit.path",
        field_type: FieldType::String,
    },
    EnvMapping {
        var_name: "WARDEN_LOG_LEVEL",
        field_path: "logging.level",
        field_type: FieldType::String,
    },
    EnvMapping {
        var_name: "WARDEN_LOG_FORMAT",
        field_path: "logging.format",
        field_type: FieldType::String,
    },
];

/// Apply environment variables to fields no config file has set.
///
/// Returns the number of variables applied.
pub fn apply_env_overrides<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| matches!(layer, ConfigLayer::User | ConfigLayer::Workspace));
        if set_by_file {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var"
            );
            set_field(merged, mapping.field_path, coerce(mapping.field_type, val));
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Coerce a raw string. Values that do not parse stay strings so that
/// deserialization reports the type mismatch against the field.
fn coerce(field_type: FieldType, val: &str) -> toml::Value {
    match field_type {
        FieldType::Integer => val
            .trim()
            .parse::<i64>()
            .map_or_else(|_| toml::Value::String(val.to_owned()), toml::Value::Integer),
        FieldType::Boolean => val
            .trim()
            .parse::<bool>()
            .map_or_else(|_| toml::Value::String(val.to_owned()), toml::Value::Boolean),
        FieldType::String => toml::Value::String(val.to_owned()),
    }
}

/// Set a dotted `section.field` path, creating the section if needed.
fn set_field(root: &mut toml::Value, path: &str, val: toml::Value) {
    let Some((section, field)) = path.split_once('.') else {
        return;
    };
    let Some(table) = root.as_table_mut() else {
        return;
    };
    let section = table
        .entry(section.to_owned())
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    if let Some(section) = section.as_table_mut() {
        section.insert(field.to_owned(), val);
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

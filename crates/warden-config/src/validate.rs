//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that enum-like strings name known values.

use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const RISK_LEVELS: [&str; 4] = ["low", "medium", "high", "critical"];

/// Upper bound for either timeout (one week).
const MAX_TIMEOUT_SECS: u64 = 604_800;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_guard(config)?;
    validate_audit(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message,
    }
}

fn is_risk_level(value: &str) -> bool {
    RISK_LEVELS.contains(&value.trim().to_ascii_lowercase().as_str())
}

fn validate_guard(config: &Config) -> ConfigResult<()> {
    let g = &config.guard;

    if g.default_agent.trim().is_empty() {
        return Err(invalid(
            "guard.default_agent",
            "must not be empty".to_owned(),
        ));
    }

    if !is_risk_level(&g.default_risk) {
        return Err(invalid(
            "guard.default_risk",
            format!(
                "unsupported risk level '{}'; expected one of: {}",
                g.default_risk,
                RISK_LEVELS.join(", ")
            ),
        ));
    }

    if let Some(threshold) = g.threshold()
        && !is_risk_level(threshold)
    {
        return Err(invalid(
            "guard.approval_threshold",
            format!(
                "unsupported risk level '{threshold}'; expected one of: {}, none",
                RISK_LEVELS.join(", ")
            ),
        ));
    }

    for (field, secs) in [
        ("guard.approval_timeout_secs", g.approval_timeout_secs),
        ("guard.execution_timeout_secs", g.execution_timeout_secs),
    ] {
        if secs > MAX_TIMEOUT_SECS {
            return Err(invalid(
                field,
                format!("{secs} exceeds the maximum of {MAX_TIMEOUT_SECS} seconds"),
            ));
        }
    }

    if g.threshold().is_some() && g.approval_timeout_secs == 0 {
        warn!(
            "guard.approval_timeout_secs is 0: gated actions wait for an approval decision indefinitely"
        );
    }

    Ok(())
}

fn validate_audit(config: &Config) -> ConfigResult<()> {
    let a = &config.audit;
    match a.backend.as_str() {
        "memory" => Ok(()),
        "surrealkv" if a.path.trim().is_empty() => Err(invalid(
            "audit.path",
            "the surrealkv backend requires a storage path".to_owned(),
        )),
        "surrealkv" => Ok(()),
        other => Err(invalid(
            "audit.backend",
            format!("unsupported backend '{other}'; expected one of: memory, surrealkv"),
        )),
    }
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}

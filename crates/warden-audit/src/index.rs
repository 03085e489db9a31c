//! Secondary index layout.
//!
//! Every action is listed under the timeline namespace and under one
//! namespace per indexed column. Index keys are `{micros:020}:{uuid}`, so
//! key order is capture order and each index doubles as a time index.

use warden_core::{Action, ActionId, ActionKind, ActionStatus, QueryFilter, RiskLevel};

/// Namespace holding the JSON rows, keyed by id.
pub(crate) const NS_ACTIONS: &str = "actions";

const NS_TIMELINE: &str = "actions:timeline";

pub(crate) fn entry_key(action: &Action) -> String {
    format!("{:020}:{}", action.timestamp.epoch_micros(), action.id)
}

/// Split an index key back into capture micros and id.
pub(crate) fn parse_entry_key(key: &str) -> Option<(u64, ActionId)> {
    let (micros, id) = key.split_once(':')?;
    Some((micros.parse().ok()?, id.parse().ok()?))
}

fn agent_ns(agent: &str) -> String {
    format!("actions:by_agent:{agent}")
}

fn kind_ns(kind: &ActionKind) -> String {
    format!("actions:by_kind:{kind}")
}

fn risk_ns(risk: RiskLevel) -> String {
    format!("actions:by_risk:{risk}")
}

pub(crate) fn status_ns(status: ActionStatus) -> String {
    format!("actions:by_status:{status}")
}

/// Every index namespace an action is listed under.
pub(crate) fn namespaces_for(action: &Action) -> [String; 5] {
    [
        NS_TIMELINE.to_owned(),
        agent_ns(&action.agent),
        kind_ns(&action.kind),
        risk_ns(action.risk),
        status_ns(action.status),
    ]
}

/// Index namespaces that can answer the equality predicates of `filter`.
///
/// Falls back to the timeline when the filter has none.
pub(crate) fn candidates_for(filter: &QueryFilter) -> Vec<String> {
    let mut namespaces = Vec::new();
    if let Some(agent) = &filter.agent {
        namespaces.push(agent_ns(agent));
    }
    if let Some(kind) = &filter.kind {
        namespaces.push(kind_ns(kind));
    }
    if let Some(risk) = filter.risk {
        namespaces.push(risk_ns(risk));
    }
    if let Some(status) = filter.status {
        namespaces.push(status_ns(status));
    }
    if namespaces.is_empty() {
        namespaces.push(NS_TIMELINE.to_owned());
    }
    namespaces
}

/// Cheap pre-check of the time range against the key's micros.
///
/// Truncation to micros is monotonic, so this never rejects a record that
/// the exact timestamp comparison would accept.
pub(crate) fn within_range(filter: &QueryFilter, micros: u64) -> bool {
    filter.since.is_none_or(|t| micros >= t.epoch_micros())
        && filter.until.is_none_or(|t| micros <= t.epoch_micros())
}

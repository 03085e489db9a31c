//! Audit trail query and statistics types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::action::{Action, ActionKind, ActionStatus};
use crate::types::{RiskLevel, Timestamp};

/// Result ordering for queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recent first.
    #[default]
    Descending,
    /// Oldest first.
    Ascending,
}

/// An immutable set of optional predicates combined by logical AND.
///
/// Unset predicates match everything. `since` and `until` are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilter {
    /// Originating agent.
    pub agent: Option<String>,
    /// Category tag.
    pub kind: Option<ActionKind>,
    /// Risk level.
    pub risk: Option<RiskLevel>,
    /// Lifecycle state.
    pub status: Option<ActionStatus>,
    /// Earliest capture time.
    pub since: Option<Timestamp>,
    /// Latest capture time.
    pub until: Option<Timestamp>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Number of leading results to skip.
    pub offset: usize,
    /// Result ordering.
    pub order: SortOrder,
}

impl QueryFilter {
    /// A filter matching every action.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only actions from `agent`.
    #[must_use]
    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Only actions of `kind`.
    #[must_use]
    pub fn kind(mut self, kind: impl Into<ActionKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Only actions at `risk`.
    #[must_use]
    pub fn risk(mut self, risk: RiskLevel) -> Self {
        self.risk = Some(risk);
        self
    }

    /// Only actions in `status`.
    #[must_use]
    pub fn status(mut self, status: ActionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Only actions captured at or after `since`.
    #[must_use]
    pub fn since(mut self, since: Timestamp) -> Self {
        self.since = Some(since);
        self
    }

    /// Only actions captured at or before `until`.
    #[must_use]
    pub fn until(mut self, until: Timestamp) -> Self {
        self.until = Some(until);
        self
    }

    /// Return at most `limit` results.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` results.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Set the result ordering.
    #[must_use]
    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Whether `action` satisfies every predicate.
    #[must_use]
    pub fn matches(&self, action: &Action) -> bool {
        self.agent.as_ref().is_none_or(|a| *a == action.agent)
            && self.kind.as_ref().is_none_or(|k| *k == action.kind)
            && self.risk.is_none_or(|r| r == action.risk)
            && self.status.is_none_or(|s| s == action.status)
            && self.since.is_none_or(|t| action.timestamp >= t)
            && self.until.is_none_or(|t| action.timestamp <= t)
    }

    /// Order, skip and truncate an already-filtered set of actions.
    ///
    /// Ties on timestamp are broken by id so consecutive pages never overlap.
    #[must_use]
    pub fn paginate(&self, mut actions: Vec<Action>) -> Vec<Action> {
        actions.sort_by(|a, b| (a.timestamp, a.id).cmp(&(b.timestamp, b.id)));
        if self.order == SortOrder::Descending {
            actions.reverse();
        }
        let iter = actions.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// Aggregate counts over the audit trail, computed at call time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Total number of actions.
    pub total: usize,
    /// Counts per risk level.
    pub by_risk: BTreeMap<String, usize>,
    /// Counts per lifecycle state.
    pub by_status: BTreeMap<String, usize>,
    /// Counts per agent.
    pub by_agent: BTreeMap<String, usize>,
}

impl StatsSnapshot {
    /// Fold one action into the counts.
    pub fn record(&mut self, action: &Action) {
        self.total = self.total.saturating_add(1);
        bump(&mut self.by_risk, action.risk.as_str());
        bump(&mut self.by_status, action.status.as_str());
        bump(&mut self.by_agent, &action.agent);
    }

    /// Count for a risk level.
    #[must_use]
    pub fn risk_count(&self, risk: RiskLevel) -> usize {
        self.by_risk.get(risk.as_str()).copied().unwrap_or(0)
    }

    /// Count for a lifecycle state.
    #[must_use]
    pub fn status_count(&self, status: ActionStatus) -> usize {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }
}

fn bump(map: &mut BTreeMap<String, usize>, key: &str) {
    let count = map.entry(key.to_owned()).or_insert(0);
    *count = count.saturating_add(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::NewAction;
    use crate::types::ActionId;
    use chrono::{Duration, Utc};

    fn action_at(agent: &str, kind: ActionKind, seconds_ago: i64) -> Action {
        let mut action = Action::capture(
            NewAction::new(kind, "q").with_agent(agent),
            RiskLevel::Low,
            "unknown",
        )
        .unwrap();
        action.timestamp = Timestamp::from_datetime(Utc::now() - Duration::seconds(seconds_ago));
        action
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let action = action_at("a", ActionKind::FileRead, 0);
        assert!(QueryFilter::new().matches(&action));
    }

    #[test]
    fn test_predicates_are_conjunctive() {
        let action = action_at("alice", ActionKind::FileRead, 0);
        assert!(QueryFilter::new().agent("alice").kind("file.read").matches(&action));
        assert!(!QueryFilter::new().agent("alice").kind("file.write").matches(&action));
        assert!(!QueryFilter::new().agent("bob").matches(&action));
    }

    #[test]
    fn test_time_range_inclusive() {
        let action = action_at("a", ActionKind::FileRead, 10);
        let filter = QueryFilter::new().since(action.timestamp).until(action.timestamp);
        assert!(filter.matches(&action));
    }

    #[test]
    fn test_paginate_descending_without_overlap() {
        let actions: Vec<Action> = (0..7)
            .map(|i| action_at("a", ActionKind::FileRead, i))
            .collect();

        let all = QueryFilter::new().paginate(actions.clone());
        assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        let page1 = QueryFilter::new().limit(3).paginate(actions.clone());
        let page2 = QueryFilter::new().limit(3).offset(3).paginate(actions.clone());
        let page3 = QueryFilter::new().limit(3).offset(6).paginate(actions);
        let joined: Vec<ActionId> = page1
            .iter()
            .chain(&page2)
            .chain(&page3)
            .map(|a| a.id)
            .collect();
        let expected: Vec<ActionId> = all.iter().map(|a| a.id).collect();
        assert_eq!(joined, expected);
    }

    #[test]
    fn test_paginate_ascending() {
        let actions: Vec<Action> = (0..3)
            .map(|i| action_at("a", ActionKind::FileRead, i))
            .collect();
        let sorted = QueryFilter::new().order(SortOrder::Ascending).paginate(actions);
        assert!(sorted.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_stats_record() {
        let mut stats = StatsSnapshot::default();
        stats.record(&action_at("a", ActionKind::FileRead, 0));
        stats.record(&action_at("b", ActionKind::FileRead, 0));
        assert_eq!(stats.total, 2);
        assert_eq!(stats.risk_count(RiskLevel::Low), 2);
        assert_eq!(stats.status_count(ActionStatus::Pending), 2);
        assert_eq!(stats.by_agent.get("a"), Some(&1));
    }
}

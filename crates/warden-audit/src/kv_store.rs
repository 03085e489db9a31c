//! [`ActionStore`] over a namespaced key-value backend.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use warden_core::{Action, ActionId, ActionUpdate, QueryFilter, StatsSnapshot};
use warden_storage::{KvStore, MemoryKvStore, ScopedKvStore};

use crate::error::{AuditError, AuditResult};
use crate::index;
use crate::store::ActionStore;

/// Action store backed by any [`KvStore`].
///
/// Rows are JSON documents under the `actions` namespace; secondary index
/// entries live in their own namespaces (see the `index` module). Writes to
/// the same id are serialised by a per-row async lock, writes to different
/// ids never contend.
pub struct KvActionStore {
    kv: Arc<dyn KvStore>,
    rows: ScopedKvStore,
    row_locks: DashMap<ActionId, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for KvActionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvActionStore")
            .field("rows", &self.rows)
            .field("locked_rows", &self.row_locks.len())
            .finish_non_exhaustive()
    }
}

impl KvActionStore {
    /// Create a store over an existing backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the row namespace cannot be bound.
    pub fn new(kv: Arc<dyn KvStore>) -> AuditResult<Self> {
        let rows = ScopedKvStore::new(Arc::clone(&kv), index::NS_ACTIONS)?;
        Ok(Self {
            kv,
            rows,
            row_locks: DashMap::new(),
        })
    }

    /// Create an ephemeral in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the row namespace cannot be bound.
    pub fn in_memory() -> AuditResult<Self> {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    /// Open or create a durable store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Storage`] if the `SurrealKV` tree cannot be opened.
    #[cfg(feature = "kv")]
    pub fn open(path: impl AsRef<std::path::Path>) -> AuditResult<Self> {
        let kv = warden_storage::SurrealKvStore::open(path)?;
        Self::new(Arc::new(kv))
    }

    fn row_lock(&self, id: ActionId) -> Arc<Mutex<()>> {
        Arc::clone(self.row_locks.entry(id).or_default().value())
    }

    /// Drop the row lock once nobody else holds or waits on it.
    fn release_row_lock(&self, id: ActionId) {
        self.row_locks
            .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn load(&self, id: ActionId) -> AuditResult<Option<Action>> {
        Ok(self.rows.get_json(&id.to_string()).await?)
    }

    async fn insert_locked(&self, action: &Action) -> AuditResult<()> {
        if !self.rows.insert_json(&action.id.to_string(), action).await? {
            return Err(AuditError::Duplicate(action.id));
        }

        let entry = index::entry_key(action);
        let id_bytes = action.id.to_string().into_bytes();
        let mut written = Vec::new();
        for namespace in index::namespaces_for(action) {
            if let Err(e) = self.kv.set(&namespace, &entry, id_bytes.clone()).await {
                self.roll_back_insert(action.id, &entry, &written).await;
                return Err(e.into());
            }
            written.push(namespace);
        }
        Ok(())
    }

    /// Remove a partially indexed row so a failed insert leaves nothing behind.
    async fn roll_back_insert(&self, id: ActionId, entry: &str, written: &[String]) {
        for namespace in written {
            if let Err(e) = self.kv.delete(namespace, entry).await {
                warn!(
                    action_id = %id,
                    namespace = %namespace,
                    error = %e,
                    "Failed to roll back index entry"
                );
            }
        }
        if let Err(e) = self.kv.delete(index::NS_ACTIONS, &id.to_string()).await {
            warn!(action_id = %id, error = %e, "Failed to roll back action row");
        }
    }

    async fn update_locked(&self, id: ActionId, update: &ActionUpdate) -> AuditResult<Action> {
        let mut action = self.load(id).await?.ok_or(AuditError::NotFound(id))?;
        if update.is_empty() {
            return Ok(action);
        }

        let previous = action.status;
        action.apply(update)?;
        let moved = action.status != previous;
        let entry = index::entry_key(&action);

        // New status entry first: a crash mid-update leaves a stale entry
        // that query re-checking filters out, never a missing one.
        if moved {
            self.kv
                .set(
                    &index::status_ns(action.status),
                    &entry,
                    id.to_string().into_bytes(),
                )
                .await?;
        }
        self.rows.set_json(&id.to_string(), &action).await?;
        if moved {
            self.kv.delete(&index::status_ns(previous), &entry).await?;
        }

        debug!(
            action_id = %id,
            from = %previous,
            to = %action.status,
            "Action updated"
        );
        Ok(action)
    }

    /// Index keys of the smallest candidate set for `filter`.
    async fn candidate_keys(&self, filter: &QueryFilter) -> AuditResult<Vec<String>> {
        let mut best: Option<Vec<String>> = None;
        for namespace in index::candidates_for(filter) {
            let keys = self.kv.list_keys(&namespace).await?;
            if keys.is_empty() {
                return Ok(keys);
            }
            if best.as_ref().is_none_or(|b| keys.len() < b.len()) {
                best = Some(keys);
            }
        }
        Ok(best.unwrap_or_default())
    }
}

#[async_trait]
impl ActionStore for KvActionStore {
    async fn insert(&self, action: &Action) -> AuditResult<()> {
        action.validate_new()?;

        let lock = self.row_lock(action.id);
        let outcome = {
            let _row = lock.lock().await;
            self.insert_locked(action).await
        };
        drop(lock);
        self.release_row_lock(action.id);

        if outcome.is_ok() {
            debug!(
                action_id = %action.id,
                kind = %action.kind,
                agent = %action.agent,
                risk = %action.risk,
                "Action recorded"
            );
        }
        outcome
    }

    async fn update(&self, id: ActionId, update: &ActionUpdate) -> AuditResult<Action> {
        let lock = self.row_lock(id);
        let outcome = {
            let _row = lock.lock().await;
            self.update_locked(id, update).await
        };
        drop(lock);
        self.release_row_lock(id);
        outcome
    }

    async fn get(&self, id: ActionId) -> AuditResult<Option<Action>> {
        self.load(id).await
    }

    async fn query(&self, filter: &QueryFilter) -> AuditResult<Vec<Action>> {
        let mut matched = Vec::new();
        for key in self.candidate_keys(filter).await? {
            let Some((micros, id)) = index::parse_entry_key(&key) else {
                warn!(key = %key, "Skipping malformed index entry");
                continue;
            };
            if !index::within_range(filter, micros) {
                continue;
            }
            match self.load(id).await? {
                Some(action) if filter.matches(&action) => matched.push(action),
                Some(_) => {},
                None => warn!(action_id = %id, "Index entry without a row"),
            }
        }
        Ok(filter.paginate(matched))
    }

    async fn stats(&self) -> AuditResult<StatsSnapshot> {
        let mut stats = StatsSnapshot::default();
        for key in self.rows.list_keys().await? {
            if let Some(action) = self.rows.get_json::<Action>(&key).await? {
                stats.record(&action);
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use warden_core::{ActionKind, ActionStatus, CoreError, NewAction, RiskLevel, Timestamp};
    use warden_storage::{StorageError, StorageResult};

    fn capture(agent: &str, kind: &str, risk: RiskLevel) -> Action {
        Action::capture(
            NewAction::new(kind, format!("{kind} by {agent}")).with_agent(agent),
            risk,
            "unknown",
        )
        .unwrap()
    }

    fn at(mut action: Action, seconds_ago: i64) -> Action {
        action.timestamp = Timestamp::from_datetime(Utc::now() - Duration::seconds(seconds_ago));
        action
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = KvActionStore::in_memory().unwrap();
        let action = capture("alice", "file.read", RiskLevel::Low);
        store.insert(&action).await.unwrap();

        let loaded = store.get(action.id).await.unwrap().unwrap();
        assert_eq!(loaded, action);
        assert!(store.get(ActionId::new()).await.unwrap().is_none());
    }

    /// Backend that refuses writes to one namespace prefix.
    struct RefusingKv {
        inner: MemoryKvStore,
        refused_prefix: &'static str,
    }

    #[async_trait]
    impl KvStore for RefusingKv {
        async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
            self.inner.get(namespace, key).await
        }

        async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
            if namespace.starts_with(self.refused_prefix) {
                return Err(StorageError::Internal("write refused".to_string()));
            }
            self.inner.set(namespace, key, value).await
        }

        async fn set_if_absent(
            &self,
            namespace: &str,
            key: &str,
            value: Vec<u8>,
        ) -> StorageResult<bool> {
            self.inner.set_if_absent(namespace, key, value).await
        }

        async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
            self.inner.delete(namespace, key).await
        }

        async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
            self.inner.list_keys(namespace).await
        }
    }

    #[tokio::test]
    async fn test_failed_index_write_leaves_no_row() {
        let store = KvActionStore::new(Arc::new(RefusingKv {
            inner: MemoryKvStore::new(),
            refused_prefix: "actions:by_risk",
        }))
        .unwrap();
        let action = capture("alice", "file.read", RiskLevel::Low);

        let err = store.insert(&action).await.unwrap_err();
        assert!(matches!(err, AuditError::Storage(_)));
        assert!(store.get(action.id).await.unwrap().is_none());
        assert!(store.query(&QueryFilter::default()).await.unwrap().is_empty());
        assert!(
            store
                .query(&QueryFilter::new().agent("alice"))
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(store.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_null_byte_agent_rejected_before_any_write() {
        let store = KvActionStore::in_memory().unwrap();
        let mut action = capture("alice", "file.read", RiskLevel::Low);
        action.agent = "bad\0agent".to_string();

        let err = store.insert(&action).await.unwrap_err();
        assert!(matches!(err, AuditError::Validation(CoreError::Invalid { .. })));
        assert!(store.get(action.id).await.unwrap().is_none());
        assert_eq!(store.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_insert_duplicate_rejected() {
        let store = KvActionStore::in_memory().unwrap();
        let action = capture("alice", "file.read", RiskLevel::Low);
        store.insert(&action).await.unwrap();

        let err = store.insert(&action).await.unwrap_err();
        assert!(matches!(err, AuditError::Duplicate(id) if id == action.id));
        assert_eq!(store.stats().await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_non_pending() {
        let store = KvActionStore::in_memory().unwrap();
        let mut action = capture("alice", "file.read", RiskLevel::Low);
        action.status = ActionStatus::Executed;
        assert!(matches!(
            store.insert(&action).await,
            Err(AuditError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = KvActionStore::in_memory().unwrap();
        let id = ActionId::new();
        let err = store
            .update(id, &ActionUpdate::status(ActionStatus::Approved))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_empty_update_returns_current() {
        let store = KvActionStore::in_memory().unwrap();
        let action = capture("alice", "file.write", RiskLevel::Medium);
        store.insert(&action).await.unwrap();

        let same = store
            .update(action.id, &ActionUpdate::default())
            .await
            .unwrap();
        assert_eq!(same, action);
    }

    #[tokio::test]
    async fn test_update_validates_transition() {
        let store = KvActionStore::in_memory().unwrap();
        let action = capture("alice", "file.write", RiskLevel::Medium);
        store.insert(&action).await.unwrap();

        let err = store
            .update(action.id, &ActionUpdate::status(ActionStatus::Undone))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuditError::Validation(CoreError::InvalidTransition { .. })
        ));
        let unchanged = store.get(action.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, ActionStatus::Pending);
    }

    #[tokio::test]
    async fn test_status_index_follows_updates() {
        let store = KvActionStore::in_memory().unwrap();
        let action = capture("alice", "file.write", RiskLevel::Medium);
        store.insert(&action).await.unwrap();
        store
            .update(action.id, &ActionUpdate::executed(json!({"bytes": 3})))
            .await
            .unwrap();

        let pending = store
            .query(&QueryFilter::new().status(ActionStatus::Pending))
            .await
            .unwrap();
        assert!(pending.is_empty());

        let executed = store
            .query(&QueryFilter::new().status(ActionStatus::Executed))
            .await
            .unwrap();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].result, Some(json!({"bytes": 3})));
    }

    #[tokio::test]
    async fn test_query_conjunction() {
        let store = KvActionStore::in_memory().unwrap();
        for action in [
            capture("alice", "file.read", RiskLevel::Low),
            capture("alice", "email.send", RiskLevel::Critical),
            capture("bob", "file.read", RiskLevel::Low),
            capture("bob", "crm.sync", RiskLevel::Medium),
        ] {
            store.insert(&action).await.unwrap();
        }

        let alice_reads = store
            .query(&QueryFilter::new().agent("alice").kind("file.read"))
            .await
            .unwrap();
        assert_eq!(alice_reads.len(), 1);
        assert_eq!(alice_reads[0].agent, "alice");

        let low = store
            .query(&QueryFilter::new().risk(RiskLevel::Low))
            .await
            .unwrap();
        assert_eq!(low.len(), 2);

        let custom = store
            .query(&QueryFilter::new().kind(ActionKind::Custom("crm.sync".into())))
            .await
            .unwrap();
        assert_eq!(custom.len(), 1);

        let nobody = store
            .query(&QueryFilter::new().agent("carol"))
            .await
            .unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn test_query_time_range_and_order() {
        let store = KvActionStore::in_memory().unwrap();
        let old = at(capture("a", "file.read", RiskLevel::Low), 300);
        let mid = at(capture("a", "file.read", RiskLevel::Low), 120);
        let new = at(capture("a", "file.read", RiskLevel::Low), 10);
        for action in [&mid, &old, &new] {
            store.insert(action).await.unwrap();
        }

        let all = store.query(&QueryFilter::new()).await.unwrap();
        let ids: Vec<ActionId> = all.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![new.id, mid.id, old.id]);

        let recent = store
            .query(&QueryFilter::new().since(mid.timestamp))
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);

        let window = store
            .query(&QueryFilter::new().since(mid.timestamp).until(mid.timestamp))
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, mid.id);
    }

    #[tokio::test]
    async fn test_query_pagination() {
        let store = KvActionStore::in_memory().unwrap();
        for i in 0..10 {
            store
                .insert(&at(capture("a", "file.read", RiskLevel::Low), i))
                .await
                .unwrap();
        }

        let everything = store.query(&QueryFilter::new()).await.unwrap();
        let mut paged = Vec::new();
        for offset in [0, 3, 6, 9] {
            let filter = QueryFilter::new().limit(3).offset(offset);
            paged.extend(store.query(&filter).await.unwrap());
        }
        assert_eq!(paged, everything);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = KvActionStore::in_memory().unwrap();
        let a = capture("alice", "file.read", RiskLevel::Low);
        let b = capture("bob", "payment", RiskLevel::Critical);
        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();
        store
            .update(b.id, &ActionUpdate::status(ActionStatus::Blocked))
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.risk_count(RiskLevel::Critical), 1);
        assert_eq!(stats.status_count(ActionStatus::Blocked), 1);
        assert_eq!(stats.status_count(ActionStatus::Pending), 1);
        assert_eq!(stats.by_agent.get("alice"), Some(&1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_completions_serialise() {
        let store = Arc::new(KvActionStore::in_memory().unwrap());
        let action = capture("alice", "file.write", RiskLevel::Medium);
        store.insert(&action).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let id = action.id;
            handles.push(tokio::spawn(async move {
                let update = if i < 8 {
                    ActionUpdate::executed(json!(i))
                } else {
                    ActionUpdate::failed(format!("worker {i}"))
                };
                store.update(id, &update).await
            }));
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }
        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);

        let stored = store.get(action.id).await.unwrap().unwrap();
        assert!(stored.result.is_some() != stored.error.is_some());
        assert!(store.row_locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_inserts() {
        let store = Arc::new(KvActionStore::in_memory().unwrap());
        let action = capture("alice", "file.read", RiskLevel::Low);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let action = action.clone();
            handles.push(tokio::spawn(async move { store.insert(&action).await }));
        }
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }
        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .filter_map(|o| o.as_ref().err())
                .all(|e| matches!(e, AuditError::Duplicate(_)))
        );
        assert_eq!(store.query(&QueryFilter::new()).await.unwrap().len(), 1);
    }

    #[cfg(feature = "kv")]
    #[tokio::test]
    async fn test_surrealkv_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let action = capture("alice", "file.write", RiskLevel::Medium);
        {
            let store = KvActionStore::open(dir.path()).unwrap();
            store.insert(&action).await.unwrap();
            store
                .update(action.id, &ActionUpdate::executed(json!("ok")))
                .await
                .unwrap();
        }
        let store = KvActionStore::open(dir.path()).unwrap();
        let loaded = store.get(action.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ActionStatus::Executed);
    }
}

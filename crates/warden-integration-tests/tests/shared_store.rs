//! Guards and stores sharing one storage backend.

#![allow(clippy::arithmetic_side_effects)]

use std::sync::Arc;

use futures::future::join_all;
use warden_audit::{ActionStore, AuditError, KvActionStore};
use warden_core::{Action, ActionKind, ActionStatus, NewAction, QueryFilter, RiskLevel};
use warden_guard::Guard;
use warden_storage::{KvStore, MemoryKvStore};

fn shared_backend() -> Arc<dyn KvStore> {
    Arc::new(MemoryKvStore::new())
}

#[tokio::test]
async fn test_guards_on_one_store_share_the_trail() {
    let store: Arc<dyn ActionStore> = Arc::new(KvActionStore::in_memory().unwrap());
    let planner = Guard::builder().store(Arc::clone(&store)).build().unwrap();
    let writer = Guard::builder().store(Arc::clone(&store)).build().unwrap();

    planner
        .guard(
            NewAction::new(ActionKind::FileRead, "Read plan").with_agent("planner"),
            || async { Ok::<_, String>("plan") },
        )
        .await
        .unwrap();
    writer
        .guard(
            NewAction::new(ActionKind::FileRead, "Read notes").with_agent("writer"),
            || async { Ok::<_, String>("notes") },
        )
        .await
        .unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.status_count(ActionStatus::Executed), 2);

    let mine = planner
        .query(&QueryFilter::new().agent("writer"))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].description, "Read notes");
}

#[tokio::test]
async fn test_trail_survives_store_reopen_on_same_backend() {
    let backend = shared_backend();
    let first = KvActionStore::new(Arc::clone(&backend)).unwrap();
    let action = Action::capture(
        NewAction::new(ActionKind::FileWrite, "Write draft").with_agent("writer"),
        RiskLevel::Medium,
        "unknown",
    )
    .unwrap();
    first.insert(&action).await.unwrap();
    drop(first);

    let second = KvActionStore::new(backend).unwrap();
    assert_eq!(second.get(action.id).await.unwrap(), Some(action.clone()));

    let by_kind = second
        .query(&QueryFilter::new().kind(ActionKind::FileWrite))
        .await
        .unwrap();
    assert_eq!(by_kind, vec![action]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_inserts_of_one_id_admit_exactly_one() {
    let store = Arc::new(KvActionStore::new(shared_backend()).unwrap());
    let action = Action::capture(
        NewAction::new(ActionKind::Payment, "Pay invoice"),
        RiskLevel::Critical,
        "billing",
    )
    .unwrap();

    let attempts = (0..16).map(|_| {
        let store = Arc::clone(&store);
        let action = action.clone();
        async move { store.insert(&action).await }
    });
    let results = join_all(attempts).await;

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(AuditError::Duplicate(id)) if *id == action.id))
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(duplicates, 15);
    assert_eq!(store.stats().await.unwrap().total, 1);
    assert_eq!(
        store
            .query(&QueryFilter::new().status(ActionStatus::Pending))
            .await
            .unwrap()
            .len(),
        1
    );
}

//! Shared helpers for the Warden integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use warden_core::{Action, ActionId};
use warden_guard::{ApprovalDecision, ApprovalHandler, Guard, GuardConfig};

/// Handler that answers every request the same way and remembers what it
/// was asked.
pub struct RecordingHandler {
    decision: Option<ApprovalDecision>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ActionId>>,
}

impl RecordingHandler {
    pub fn new(decision: Option<ApprovalDecision>) -> Arc<Self> {
        Arc::new(Self {
            decision,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn approving() -> Arc<Self> {
        Self::new(Some(ApprovalDecision::Approve))
    }

    pub fn denying(reason: &str) -> Arc<Self> {
        Self::new(Some(ApprovalDecision::deny(reason)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<ActionId> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApprovalHandler for RecordingHandler {
    async fn decide(&self, action: Action) -> Option<ApprovalDecision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(action.id);
        self.decision.clone()
    }
}

/// A guard over a fresh in-memory store with the given handler.
pub fn guard_with(handler: Arc<RecordingHandler>, config: GuardConfig) -> Guard {
    Guard::builder()
        .config(config)
        .approval_handler(handler)
        .build()
        .unwrap()
}

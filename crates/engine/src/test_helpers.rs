// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::{Dispatcher, Journal, OrchestratorConfig, RetryPolicy};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tfg_adapters::FakeActivities;
use tfg_core::{DeployRequest, Phase, PlanReviewSignal, RunId, SequentialIdGen, WorkflowId};
use tfg_storage::{MaterializedState, Wal, WorkflowRecord};

pub(crate) type TestDispatcher = Dispatcher<FakeActivities, SequentialIdGen>;

/// Test context holding the dispatcher, the fake activities and the WAL.
pub(crate) struct TestContext {
    pub dispatcher: TestDispatcher,
    pub activities: FakeActivities,
    pub wal: Arc<Mutex<Wal>>,
    pub data_dir: PathBuf,
    pub dir: Arc<TempDir>,
}

pub(crate) fn test_config(data_dir: &Path) -> OrchestratorConfig {
    OrchestratorConfig {
        retry: RetryPolicy::no_retry(),
        activity_timeout: Duration::from_secs(30),
        session_creation_timeout: Duration::from_secs(30),
        ..OrchestratorConfig::new(data_dir)
    }
}

/// Fresh dispatcher over an empty WAL. Must be called inside a runtime.
pub(crate) fn setup() -> TestContext {
    let dir = Arc::new(tempfile::tempdir().unwrap());
    open(dir, "run")
}

/// Dispatcher over whatever the WAL in `dir` holds, replayed into state.
pub(crate) fn reopen(previous: &TestContext) -> TestContext {
    previous.wal.lock().flush().unwrap();
    open(Arc::clone(&previous.dir), "rerun")
}

fn open(dir: Arc<TempDir>, id_prefix: &str) -> TestContext {
    let wal = Wal::open(&dir.path().join("wal").join("events.wal"), 0).unwrap();
    let mut state = MaterializedState::default();
    for entry in wal.entries_after(0).unwrap() {
        state.apply_event(&entry.event);
    }
    let wal = Arc::new(Mutex::new(wal));
    let journal = Journal::new(Arc::clone(&wal), Arc::new(Mutex::new(state)));
    let data_dir = dir.path().join("repos");
    let activities = FakeActivities::new();
    let dispatcher = Dispatcher::new(
        activities.clone(),
        journal,
        test_config(&data_dir),
        SequentialIdGen::new(id_prefix),
    );
    TestContext {
        dispatcher,
        activities,
        wal,
        data_dir,
        dir,
    }
}

pub(crate) fn acme() -> DeployRequest {
    DeployRequest::new("acme", "infra", "main")
}

pub(crate) fn acme_id() -> WorkflowId {
    acme().workflow_id()
}

/// Poll until `check` holds, failing the test after a few seconds.
pub(crate) async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

impl TestContext {
    pub fn record(&self, workflow_id: &WorkflowId) -> WorkflowRecord {
        self.dispatcher.describe(workflow_id.as_str()).unwrap()
    }

    pub fn phase(&self, workflow_id: &WorkflowId) -> Option<Phase> {
        self.dispatcher
            .describe(workflow_id.as_str())
            .and_then(|r| r.attempt.map(|a| a.phase))
    }

    pub async fn wait_for_review(&self, workflow_id: &WorkflowId) {
        wait_until("awaiting review", || {
            self.phase(workflow_id) == Some(Phase::AwaitingReview)
        })
        .await;
    }

    pub async fn wait_for_end(&self, workflow_id: &WorkflowId) {
        wait_until("workflow end", || {
            !self.dispatcher.is_active(workflow_id.as_str())
                && self
                    .dispatcher
                    .describe(workflow_id.as_str())
                    .is_some_and(|r| !r.is_running())
        })
        .await;
    }

    pub fn review(&self, workflow_id: &WorkflowId, run_id: &RunId, status: &str) {
        self.dispatcher
            .signal_review(workflow_id, run_id, PlanReviewSignal::new("alice", status))
            .unwrap();
    }
}

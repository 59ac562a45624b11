// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;
use tfg_core::{DeployRequest, Event, Revision, RunId, WorkflowId};

fn state_with_pending() -> MaterializedState {
    let mut state = MaterializedState::default();
    state.apply_event(&Event::WorkflowStarted {
        workflow_id: WorkflowId::new("acme/infra/main"),
        run_id: RunId::new("r1"),
        request: DeployRequest::new("acme", "infra", "main"),
        created_at_ms: 1,
    });
    state.apply_event(&Event::RevisionReceived {
        workflow_id: WorkflowId::new("acme/infra/main"),
        run_id: RunId::new("r1"),
        revision: Revision::new("abc123"),
    });
    state
}

#[test]
fn save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    Snapshot::new(42, state_with_pending()).save(&path).unwrap();
    assert!(!path.with_extension("tmp").exists());

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.version, SNAPSHOT_VERSION);
    assert_eq!(loaded.seq, 42);
    let record = loaded.state.get("acme/infra/main").unwrap();
    assert_eq!(record.pending, Some(Revision::new("abc123")));
}

#[test]
fn load_missing_is_none() {
    let dir = tempdir().unwrap();
    assert!(Snapshot::load(&dir.path().join("nope.json")).unwrap().is_none());
}

#[test]
fn corrupt_snapshot_is_quarantined() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, "{not json").unwrap();

    assert!(Snapshot::load(&path).unwrap().is_none());
    assert!(!path.exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("snapshot.json.corrupt.1")).unwrap(),
        "{not json"
    );
}

#[test]
fn snapshot_from_another_version_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let mut snapshot = Snapshot::new(7, state_with_pending());
    snapshot.version = SNAPSHOT_VERSION + 1;
    snapshot.save(&path).unwrap();

    let err = Snapshot::load(&path).unwrap_err();

    assert!(
        matches!(err, SnapshotError::Version { found, .. } if found == SNAPSHOT_VERSION + 1)
    );
    // Left in place: the WAL behind it is already truncated
    assert!(path.exists());
}

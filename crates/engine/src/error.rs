// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the deploy engine

use std::time::Duration;
use tfg_adapters::ActivityError;
use tfg_core::{ActivityKind, RunId, WorkflowId};
use tfg_storage::WalError;
use thiserror::Error;

/// The journal could not record an event.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
}

/// Errors from acquiring or using a pinned session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no execution unit accepted a session within {}s", .0.as_secs())]
    CreationTimeout(Duration),
    #[error("session exceeded its {}s execution timeout", .0.as_secs())]
    ExecutionTimeout(Duration),
    #[error("session already released")]
    Released,
    #[error("execution unit {0} stopped")]
    UnitStopped(usize),
    #[error("{kind} failed: {source}")]
    Activity {
        kind: ActivityKind,
        #[source]
        source: ActivityError,
    },
}

#[derive(Debug, Error)]
pub enum GateError {
    /// Every sender of the review channel is gone.
    #[error("plan review channel closed")]
    Closed,
    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Terminal errors of an orchestrator instance
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("{kind} failed: {source}")]
    Activity {
        kind: ActivityKind,
        #[source]
        source: ActivityError,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Journal(#[from] JournalError),
    /// The instance was stopped from outside (daemon shutdown).
    #[error("interrupted")]
    Interrupted,
}

impl From<GateError> for DeployError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::Closed => DeployError::Interrupted,
            GateError::Journal(e) => DeployError::Journal(e),
        }
    }
}

/// Errors returned to callers of the dispatcher
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no running workflow: {0}")]
    NotFound(WorkflowId),
    #[error("workflow {workflow_id} is running {current}, not {requested}")]
    RunMismatch {
        workflow_id: WorkflowId,
        current: RunId,
        requested: RunId,
    },
    /// The run has no attempt whose plan is still open to review.
    #[error("workflow {workflow_id} run {run_id} has no attempt to review")]
    NotReviewable {
        workflow_id: WorkflowId,
        run_id: RunId,
    },
    #[error(transparent)]
    Journal(#[from] JournalError),
}

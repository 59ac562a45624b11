// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal events for orchestrator instances
//!
//! Every transition and every accepted notification is recorded as an
//! event before the orchestrator acts on it. Replaying the events in
//! order rebuilds each instance's state after a restart.

use crate::deploy::{DeployRequest, PlanArtifact, Revision};
use crate::id::{RunId, WorkflowId};
use crate::workflow::{AttemptOutcome, Phase};
use serde::{Deserialize, Serialize};

/// Serializes with `{"type": "scope:name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- workflow --
    #[serde(rename = "workflow:started")]
    WorkflowStarted {
        workflow_id: WorkflowId,
        run_id: RunId,
        request: DeployRequest,
        #[serde(default)]
        created_at_ms: u64,
    },

    #[serde(rename = "workflow:completed")]
    WorkflowCompleted { workflow_id: WorkflowId, run_id: RunId },

    #[serde(rename = "workflow:failed")]
    WorkflowFailed {
        workflow_id: WorkflowId,
        run_id: RunId,
        error: String,
    },

    // -- revision --
    #[serde(rename = "revision:received")]
    RevisionReceived {
        workflow_id: WorkflowId,
        run_id: RunId,
        revision: Revision,
    },

    // -- attempt --
    #[serde(rename = "attempt:started")]
    AttemptStarted {
        workflow_id: WorkflowId,
        run_id: RunId,
        attempt: u64,
        revision: Revision,
    },

    #[serde(rename = "attempt:phase")]
    AttemptPhase {
        workflow_id: WorkflowId,
        run_id: RunId,
        attempt: u64,
        phase: Phase,
    },

    #[serde(rename = "attempt:planned")]
    AttemptPlanned {
        workflow_id: WorkflowId,
        run_id: RunId,
        attempt: u64,
        plan: PlanArtifact,
    },

    #[serde(rename = "attempt:finished")]
    AttemptFinished {
        workflow_id: WorkflowId,
        run_id: RunId,
        attempt: u64,
        outcome: AttemptOutcome,
    },

    // -- review --
    /// A review signal accepted into the instance's mailbox, addressed to
    /// the attempt in progress at the time.
    #[serde(rename = "review:received")]
    ReviewReceived {
        workflow_id: WorkflowId,
        run_id: RunId,
        attempt: u64,
        user: String,
        status: String,
    },

    /// The gate took the oldest received signal off the mailbox.
    #[serde(rename = "review:consumed")]
    ReviewConsumed {
        workflow_id: WorkflowId,
        run_id: RunId,
        attempt: u64,
        user: String,
        status: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::WorkflowStarted { .. } => "workflow:started",
            Event::WorkflowCompleted { .. } => "workflow:completed",
            Event::WorkflowFailed { .. } => "workflow:failed",
            Event::RevisionReceived { .. } => "revision:received",
            Event::AttemptStarted { .. } => "attempt:started",
            Event::AttemptPhase { .. } => "attempt:phase",
            Event::AttemptPlanned { .. } => "attempt:planned",
            Event::AttemptFinished { .. } => "attempt:finished",
            Event::ReviewReceived { .. } => "review:received",
            Event::ReviewConsumed { .. } => "review:consumed",
        }
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        match self {
            Event::WorkflowStarted { workflow_id, .. }
            | Event::WorkflowCompleted { workflow_id, .. }
            | Event::WorkflowFailed { workflow_id, .. }
            | Event::RevisionReceived { workflow_id, .. }
            | Event::AttemptStarted { workflow_id, .. }
            | Event::AttemptPhase { workflow_id, .. }
            | Event::AttemptPlanned { workflow_id, .. }
            | Event::AttemptFinished { workflow_id, .. }
            | Event::ReviewReceived { workflow_id, .. }
            | Event::ReviewConsumed { workflow_id, .. } => workflow_id,
        }
    }

    pub fn run_id(&self) -> &RunId {
        match self {
            Event::WorkflowStarted { run_id, .. }
            | Event::WorkflowCompleted { run_id, .. }
            | Event::WorkflowFailed { run_id, .. }
            | Event::RevisionReceived { run_id, .. }
            | Event::AttemptStarted { run_id, .. }
            | Event::AttemptPhase { run_id, .. }
            | Event::AttemptPlanned { run_id, .. }
            | Event::AttemptFinished { run_id, .. }
            | Event::ReviewReceived { run_id, .. }
            | Event::ReviewConsumed { run_id, .. } => run_id,
        }
    }

    /// One-line summary for logs. Never includes plan output.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        let id = self.workflow_id();
        match self {
            Event::WorkflowStarted { run_id, .. } | Event::WorkflowCompleted { run_id, .. } => {
                format!("{t} id={id} run={run_id}")
            }
            Event::WorkflowFailed { error, .. } => format!("{t} id={id} error={error}"),
            Event::RevisionReceived { revision, .. } => format!("{t} id={id} rev={revision}"),
            Event::AttemptStarted {
                attempt, revision, ..
            } => format!("{t} id={id} attempt={attempt} rev={revision}"),
            Event::AttemptPhase { attempt, phase, .. } => {
                format!("{t} id={id} attempt={attempt} phase={phase}")
            }
            Event::AttemptPlanned { attempt, plan, .. } => format!(
                "{t} id={id} attempt={attempt} plan_file={}",
                plan.plan_file.display()
            ),
            Event::AttemptFinished {
                attempt, outcome, ..
            } => format!("{t} id={id} attempt={attempt} outcome={outcome:?}"),
            Event::ReviewReceived {
                attempt,
                user,
                status,
                ..
            }
            | Event::ReviewConsumed {
                attempt,
                user,
                status,
                ..
            } => format!("{t} id={id} attempt={attempt} user={user} status={status}"),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

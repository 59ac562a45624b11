// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized orchestrator state from journal replay

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tfg_core::{
    AttemptOutcome, AttemptReview, DeployRequest, Event, Phase, PlanArtifact, PlanReviewSignal,
    Revision, RunId, WorkflowId, WorkflowStatus,
};

/// The deploy attempt an instance is currently driving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub number: u64,
    pub revision: Revision,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanArtifact>,
}

/// Everything known about one orchestrator instance run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub workflow_id: WorkflowId,
    pub run_id: RunId,
    pub request: DeployRequest,
    pub status: WorkflowStatus,
    /// Last-write-wins mailbox slot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<Revision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<AttemptRecord>,
    /// Review signals for the current attempt not yet taken by the gate,
    /// oldest first
    #[serde(default, skip_serializing_if = "VecDeque::is_empty")]
    pub reviews: VecDeque<AttemptReview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_revision: Option<Revision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<AttemptOutcome>,
    #[serde(default)]
    pub attempts_finished: u64,
    pub created_at_ms: u64,
    #[serde(default)]
    pub updated_at_ms: u64,
}

impl WorkflowRecord {
    pub fn is_running(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Number the next attempt of this run should get.
    pub fn next_attempt_number(&self) -> u64 {
        self.attempt
            .as_ref()
            .map(|a| a.number)
            .unwrap_or(self.attempts_finished)
            + 1
    }
}

/// State derived from the journal.
///
/// Keyed by workflow id; a key that drained and started again keeps only
/// its newest run.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    #[serde(default)]
    pub workflows: BTreeMap<WorkflowId, WorkflowRecord>,
}

impl MaterializedState {
    pub fn get(&self, workflow_id: &str) -> Option<&WorkflowRecord> {
        self.workflows.get(workflow_id)
    }

    /// Runs that had not finished when the journal ends.
    pub fn running(&self) -> impl Iterator<Item = &WorkflowRecord> {
        self.workflows.values().filter(|w| w.is_running())
    }

    /// Record for the event's run, ignoring events from superseded runs.
    fn run_mut(&mut self, event: &Event) -> Option<&mut WorkflowRecord> {
        self.workflows
            .get_mut(event.workflow_id().as_str())
            .filter(|w| &w.run_id == event.run_id())
    }

    /// Apply an event to derive state changes.
    ///
    /// Events addressed to a run other than the key's newest are ignored.
    pub fn apply_event(&mut self, event: &Event) {
        self.apply_event_at(event, tfg_core::epoch_ms_now());
    }

    pub fn apply_event_at(&mut self, event: &Event, now_ms: u64) {
        if let Event::WorkflowStarted {
            workflow_id,
            run_id,
            request,
            created_at_ms,
        } = event
        {
            if self
                .get(workflow_id.as_str())
                .is_some_and(|w| &w.run_id == run_id)
            {
                return;
            }
            self.workflows.insert(
                workflow_id.clone(),
                WorkflowRecord {
                    workflow_id: workflow_id.clone(),
                    run_id: run_id.clone(),
                    request: request.clone(),
                    status: WorkflowStatus::Running,
                    pending: None,
                    attempt: None,
                    reviews: VecDeque::new(),
                    last_revision: None,
                    last_outcome: None,
                    attempts_finished: 0,
                    created_at_ms: *created_at_ms,
                    updated_at_ms: *created_at_ms,
                },
            );
            return;
        }

        let Some(record) = self.run_mut(event) else {
            return;
        };
        record.updated_at_ms = now_ms;

        match event {
            Event::WorkflowStarted { .. } => {}

            Event::WorkflowCompleted { .. } => {
                record.status = WorkflowStatus::Completed;
            }

            Event::WorkflowFailed { error, .. } => {
                record.status = WorkflowStatus::Failed {
                    error: error.clone(),
                };
            }

            Event::RevisionReceived { revision, .. } => {
                record.pending = Some(revision.clone());
            }

            Event::AttemptStarted {
                attempt, revision, ..
            } => {
                if record.attempt.as_ref().is_some_and(|a| a.number == *attempt) {
                    return;
                }
                // Consuming the revision clears the mailbox slot, unless a
                // newer revision already overwrote it.
                if record.pending.as_ref() == Some(revision) {
                    record.pending = None;
                }
                record.attempt = Some(AttemptRecord {
                    number: *attempt,
                    revision: revision.clone(),
                    phase: Phase::Resolving,
                    plan: None,
                });
            }

            Event::AttemptPhase { attempt, phase, .. } => {
                if let Some(current) = record.attempt.as_mut().filter(|a| a.number == *attempt) {
                    current.phase = *phase;
                }
            }

            Event::AttemptPlanned { attempt, plan, .. } => {
                if let Some(current) = record.attempt.as_mut().filter(|a| a.number == *attempt) {
                    current.plan = Some(plan.clone());
                }
            }

            Event::AttemptFinished {
                attempt, outcome, ..
            } => {
                if let Some(done) = record.attempt.take_if(|a| a.number == *attempt) {
                    record.last_revision = Some(done.revision);
                    record.last_outcome = Some(*outcome);
                    record.attempts_finished = record.attempts_finished.max(*attempt);
                }
                record.reviews.retain(|r| r.attempt > *attempt);
            }

            Event::ReviewReceived {
                attempt,
                user,
                status,
                ..
            } => {
                // The addressed attempt may have finished since the review
                // was accepted; it is never carried into the next one.
                if record.attempt.as_ref().is_some_and(|a| a.number == *attempt) {
                    record.reviews.push_back(AttemptReview {
                        attempt: *attempt,
                        signal: PlanReviewSignal::new(user.clone(), status.clone()),
                    });
                }
            }

            Event::ReviewConsumed {
                attempt,
                user,
                status,
                ..
            } => {
                if let Some(pos) = record.reviews.iter().position(|r| {
                    r.attempt == *attempt && r.signal.user == *user && r.signal.status == *status
                }) {
                    record.reviews.remove(pos);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

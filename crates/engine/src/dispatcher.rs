// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator registry: creates, locates and signals instances

use crate::error::{DeployError, DispatchError};
use crate::gate::PlanReviewGate;
use crate::journal::Journal;
use crate::orchestrator::{Deps, DeployWorkflow, OrchestratorConfig};
use crate::pending::{Offer, PendingRevision};
use crate::session::SessionStats;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tfg_adapters::Activities;
use tfg_core::{
    epoch_ms_now, AttemptReview, DeployRequest, Event, IdGen, Phase, PlanReviewSignal, Revision,
    RunId, UuidIdGen, WorkflowId,
};
use tfg_storage::{AttemptRecord, WorkflowRecord};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// A live instance as seen by the registry
struct Instance {
    run_id: RunId,
    pending: Arc<PendingRevision>,
    reviews: mpsc::UnboundedSender<AttemptReview>,
    task: JoinHandle<()>,
}

struct Inner<A, I> {
    deps: Arc<Deps<A>>,
    ids: I,
    instances: Mutex<HashMap<WorkflowId, Instance>>,
}

/// What a spawned instance starts from
struct Launch {
    workflow_id: WorkflowId,
    run_id: RunId,
    request: DeployRequest,
    pending: Option<Revision>,
    reviews: VecDeque<AttemptReview>,
    next_attempt: u64,
    resume: Option<AttemptRecord>,
}

/// Entry point for deploy and review signals.
///
/// At most one instance runs per workflow id. Registry lookups, mailbox
/// offers and the journal records for them happen under one lock.
pub struct Dispatcher<A, I = UuidIdGen> {
    inner: Arc<Inner<A, I>>,
}

impl<A, I> Clone for Dispatcher<A, I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Activities, I: IdGen> Dispatcher<A, I> {
    /// Must be called inside a tokio runtime.
    pub fn new(activities: A, journal: Journal, config: OrchestratorConfig, ids: I) -> Self {
        Self {
            inner: Arc::new(Inner {
                deps: Arc::new(Deps::new(activities, journal, config)),
                ids,
                instances: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Deliver a new commit to the instance for `request`, starting a new
    /// run when none is accepting revisions.
    pub fn signal_with_start(
        &self,
        request: DeployRequest,
        revision: Revision,
    ) -> Result<(WorkflowId, RunId), DispatchError> {
        let journal = &self.inner.deps.journal;
        let workflow_id = request.workflow_id();
        let mut instances = self.inner.instances.lock();

        if let Some(instance) = instances.get(&workflow_id) {
            let offer = instance.pending.offer(revision.clone(), |revision| {
                journal.record(Event::RevisionReceived {
                    workflow_id: workflow_id.clone(),
                    run_id: instance.run_id.clone(),
                    revision: revision.clone(),
                })
            })?;
            if let Offer::Accepted { replaced } = offer {
                if let Some(replaced) = replaced {
                    tracing::info!(workflow = %workflow_id, %replaced, %revision, "superseded pending revision");
                } else {
                    tracing::info!(workflow = %workflow_id, %revision, "queued revision");
                }
                return Ok((workflow_id, instance.run_id.clone()));
            }
        }

        let run_id = RunId::new(self.inner.ids.next());
        journal.record(Event::WorkflowStarted {
            workflow_id: workflow_id.clone(),
            run_id: run_id.clone(),
            request: request.clone(),
            created_at_ms: epoch_ms_now(),
        })?;
        journal.record(Event::RevisionReceived {
            workflow_id: workflow_id.clone(),
            run_id: run_id.clone(),
            revision: revision.clone(),
        })?;
        tracing::info!(workflow = %workflow_id, run = %run_id, %revision, "started workflow");

        let instance = self.launch(Launch {
            workflow_id: workflow_id.clone(),
            run_id: run_id.clone(),
            request,
            pending: Some(revision),
            reviews: VecDeque::new(),
            next_attempt: 1,
            resume: None,
        });
        instances.insert(workflow_id.clone(), instance);
        Ok((workflow_id, run_id))
    }

    /// Deliver a plan review to the exact run it names.
    ///
    /// The review is addressed to the attempt in progress and only that
    /// attempt's gate acts on it. It is refused once the attempt's decision
    /// has been taken or while no attempt is running. The status is not
    /// validated here; the gate ignores unknown ones.
    pub fn signal_review(
        &self,
        workflow_id: &WorkflowId,
        run_id: &RunId,
        signal: PlanReviewSignal,
    ) -> Result<(), DispatchError> {
        let instances = self.inner.instances.lock();
        let instance = instances
            .get(workflow_id)
            .filter(|i| !i.reviews.is_closed())
            .ok_or_else(|| DispatchError::NotFound(workflow_id.clone()))?;
        if &instance.run_id != run_id {
            return Err(DispatchError::RunMismatch {
                workflow_id: workflow_id.clone(),
                current: instance.run_id.clone(),
                requested: run_id.clone(),
            });
        }

        let journal = &self.inner.deps.journal;
        let attempt = journal
            .read(|state| {
                state
                    .get(workflow_id.as_str())
                    .filter(|r| &r.run_id == run_id)
                    .and_then(|r| r.attempt.as_ref())
                    .filter(|a| a.phase != Phase::Applying)
                    .map(|a| a.number)
            })
            .ok_or_else(|| DispatchError::NotReviewable {
                workflow_id: workflow_id.clone(),
                run_id: run_id.clone(),
            })?;

        journal.record(Event::ReviewReceived {
            workflow_id: workflow_id.clone(),
            run_id: run_id.clone(),
            attempt,
            user: signal.user.clone(),
            status: signal.status.clone(),
        })?;
        tracing::info!(workflow = %workflow_id, run = %run_id, attempt, user = %signal.user, status = %signal.status, "plan review received");
        instance
            .reviews
            .send(AttemptReview { attempt, signal })
            .map_err(|_| DispatchError::NotFound(workflow_id.clone()))
    }

    /// Latest record for a workflow id, running or not
    pub fn describe(&self, workflow_id: &str) -> Option<WorkflowRecord> {
        self.inner
            .deps
            .journal
            .read(|state| state.get(workflow_id).cloned())
    }

    pub fn list(&self) -> Vec<WorkflowRecord> {
        self.inner
            .deps
            .journal
            .read(|state| state.workflows.values().cloned().collect())
    }

    /// Restart every workflow the journal still shows as running.
    ///
    /// Returns how many were resumed.
    pub fn recover(&self) -> usize {
        let running: Vec<WorkflowRecord> = self
            .inner
            .deps
            .journal
            .read(|state| state.running().cloned().collect());
        let mut instances = self.inner.instances.lock();
        let mut resumed = 0;
        for record in running {
            if instances.contains_key(&record.workflow_id) {
                continue;
            }
            tracing::info!(
                workflow = %record.workflow_id,
                run = %record.run_id,
                pending = ?record.pending,
                attempt = ?record.attempt.as_ref().map(|a| (a.number, a.phase)),
                reviews = record.reviews.len(),
                "recovering workflow"
            );
            let instance = self.launch(Launch {
                workflow_id: record.workflow_id.clone(),
                run_id: record.run_id.clone(),
                next_attempt: record.next_attempt_number(),
                request: record.request,
                pending: record.pending,
                reviews: record.reviews,
                resume: record.attempt,
            });
            instances.insert(record.workflow_id, instance);
            resumed += 1;
        }
        resumed
    }

    /// Whether a live instance exists for the workflow id
    pub fn is_active(&self, workflow_id: &str) -> bool {
        self.inner.instances.lock().contains_key(workflow_id)
    }

    pub fn session_stats(&self) -> SessionStats {
        self.inner.deps.sessions.stats()
    }

    /// Stop every instance without journaling an outcome; a later
    /// `recover` resumes them.
    pub fn shutdown(&self) {
        let drained: Vec<(WorkflowId, Instance)> = self.inner.instances.lock().drain().collect();
        for (workflow_id, instance) in drained {
            tracing::info!(workflow = %workflow_id, run = %instance.run_id, "stopping workflow");
            instance.task.abort();
        }
    }

    fn launch(&self, launch: Launch) -> Instance {
        let (reviews_tx, reviews_rx) = mpsc::unbounded_channel();
        for review in launch.reviews {
            if let Err(e) = reviews_tx.send(review) {
                tracing::warn!(
                    workflow = %launch.workflow_id,
                    attempt = e.0.attempt,
                    user = %e.0.signal.user,
                    "failed to redeliver plan review"
                );
            }
        }
        let pending = Arc::new(PendingRevision::new(launch.pending));
        let span = tracing::info_span!(
            "workflow",
            id = %launch.workflow_id,
            run = %launch.run_id,
        );
        let workflow = DeployWorkflow {
            deps: Arc::clone(&self.inner.deps),
            workflow_id: launch.workflow_id,
            run_id: launch.run_id.clone(),
            request: launch.request,
            pending: Arc::clone(&pending),
            gate: PlanReviewGate::new(reviews_rx),
            next_attempt: launch.next_attempt,
            resume: launch.resume,
        };
        let task = tokio::spawn(run_instance(Arc::clone(&self.inner), workflow).instrument(span));
        Instance {
            run_id: launch.run_id,
            pending,
            reviews: reviews_tx,
            task,
        }
    }
}

async fn run_instance<A: Activities, I: IdGen>(inner: Arc<Inner<A, I>>, workflow: DeployWorkflow<A>) {
    let workflow_id = workflow.workflow_id.clone();
    let run_id = workflow.run_id.clone();
    let pending = Arc::clone(&workflow.pending);

    match workflow.run().await {
        Ok(()) => {}
        Err(DeployError::Interrupted) => {
            tracing::info!("workflow interrupted");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "workflow failed");
            let journal = &inner.deps.journal;
            let recorded = pending.close(|| {
                journal.record(Event::WorkflowFailed {
                    workflow_id: workflow_id.clone(),
                    run_id: run_id.clone(),
                    error: e.to_string(),
                })
            });
            if let Err(e) = recorded {
                tracing::error!(error = %e, "failed to record workflow failure");
            }
        }
    }

    let mut instances = inner.instances.lock();
    if instances.get(&workflow_id).is_some_and(|i| i.run_id == run_id) {
        instances.remove(&workflow_id);
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

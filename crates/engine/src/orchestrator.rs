// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deploy orchestrator: one state machine per repository + branch
//!
//! An instance repeatedly takes the pending revision and drives one attempt
//! (resolve, clone, init, plan, review, apply) to an end before looking
//! again. It completes the first time it finds nothing pending.

use crate::error::{DeployError, JournalError};
use crate::executor::{ActivityExecutor, RetryPolicy};
use crate::gate::PlanReviewGate;
use crate::journal::Journal;
use crate::pending::PendingRevision;
use crate::session::{Session, SessionConfig, SessionManager};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tfg_adapters::Activities;
use tfg_core::{
    ActivityKind, ApplyRequest, AttemptOutcome, CloneRequest, DeployRequest, Event,
    GetRepositoryRequest, InitRequest, Phase, PlanArtifact, PlanRequest, PlanReviewDecision,
    Repository, ReviewStatus, RunId, WorkflowId,
};
use tfg_storage::AttemptRecord;
use tracing::Instrument;

/// Timeouts and retry settings for orchestrator instances
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Working copies live at `<data_dir>/<owner>/<name>`
    pub data_dir: PathBuf,
    /// Schedule-to-close budget of a single activity call
    pub activity_timeout: Duration,
    pub retry: RetryPolicy,
    pub session_creation_timeout: Duration,
    pub session_execution_timeout: Duration,
    pub sessions: SessionConfig,
}

impl OrchestratorConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            activity_timeout: Duration::from_secs(60 * 60),
            retry: RetryPolicy::default(),
            session_creation_timeout: Duration::from_secs(5 * 60),
            session_execution_timeout: Duration::from_secs(2 * 60 * 60),
            sessions: SessionConfig::default(),
        }
    }
}

/// Collaborators shared by every instance
pub(crate) struct Deps<A> {
    pub executor: ActivityExecutor<A>,
    pub sessions: SessionManager,
    pub journal: Journal,
    pub config: OrchestratorConfig,
}

impl<A: Activities> Deps<A> {
    /// Must be called inside a tokio runtime.
    pub(crate) fn new(activities: A, journal: Journal, config: OrchestratorConfig) -> Self {
        let executor =
            ActivityExecutor::new(activities, config.retry.clone(), config.activity_timeout);
        let sessions = SessionManager::new(executor.clone(), config.sessions.clone());
        Self {
            executor,
            sessions,
            journal,
            config,
        }
    }
}

/// Where an attempt picks up
enum Start {
    Fresh(Repository),
    Review(PlanArtifact),
    Apply(PlanArtifact),
}

pub(crate) struct DeployWorkflow<A> {
    pub deps: Arc<Deps<A>>,
    pub workflow_id: WorkflowId,
    pub run_id: RunId,
    pub request: DeployRequest,
    pub pending: Arc<PendingRevision>,
    pub gate: PlanReviewGate,
    pub next_attempt: u64,
    /// Attempt interrupted by a restart
    pub resume: Option<AttemptRecord>,
}

impl<A: Activities> DeployWorkflow<A> {
    pub(crate) async fn run(mut self) -> Result<(), DeployError> {
        if let Some(attempt) = self.resume.take() {
            tracing::info!(attempt = attempt.number, phase = %attempt.phase, "resuming attempt");
            self.next_attempt = self.next_attempt.max(attempt.number + 1);
            self.attempt(attempt).await?;
        }
        while let Some(attempt) = self.next_attempt()? {
            self.attempt(attempt).await?;
        }
        tracing::info!("no pending revision, workflow complete");
        Ok(())
    }

    fn next_attempt(&mut self) -> Result<Option<AttemptRecord>, JournalError> {
        let number = self.next_attempt;
        let journal = &self.deps.journal;
        let taken = self.pending.take_or_close(
            |revision| {
                journal.record(Event::AttemptStarted {
                    workflow_id: self.workflow_id.clone(),
                    run_id: self.run_id.clone(),
                    attempt: number,
                    revision: revision.clone(),
                })
            },
            || {
                journal.record(Event::WorkflowCompleted {
                    workflow_id: self.workflow_id.clone(),
                    run_id: self.run_id.clone(),
                })
            },
        )?;
        Ok(taken.map(|revision| {
            self.next_attempt += 1;
            AttemptRecord {
                number,
                revision,
                phase: Phase::Resolving,
                plan: None,
            }
        }))
    }

    async fn attempt(&mut self, attempt: AttemptRecord) -> Result<(), DeployError> {
        let span = tracing::info_span!(
            "attempt",
            number = attempt.number,
            revision = %attempt.revision,
        );
        self.run_attempt(attempt).instrument(span).await
    }

    async fn run_attempt(&mut self, attempt: AttemptRecord) -> Result<(), DeployError> {
        let start = match (attempt.phase, attempt.plan.clone()) {
            (Phase::Applying, Some(plan)) => Start::Apply(plan),
            (Phase::AwaitingReview, Some(plan)) => Start::Review(plan),
            _ => Start::Fresh(self.resolve().await?),
        };

        let config = &self.deps.config;
        let mut session = self
            .deps
            .sessions
            .acquire(
                config.session_creation_timeout,
                config.session_execution_timeout,
            )
            .await?;
        tracing::info!(session = %session.id(), unit = session.unit(), "session acquired");

        let result = self.drive(&session, &attempt, start).await;
        session.release();
        result
    }

    async fn resolve(&self) -> Result<Repository, DeployError> {
        self.deps
            .executor
            .get_repository(GetRepositoryRequest {
                owner: self.request.owner().to_string(),
                name: self.request.name().to_string(),
            })
            .await
            .map_err(|source| DeployError::Activity {
                kind: ActivityKind::GetRepository,
                source,
            })
    }

    async fn drive(
        &mut self,
        session: &Session,
        attempt: &AttemptRecord,
        start: Start,
    ) -> Result<(), DeployError> {
        let number = attempt.number;
        let (plan, approved) = match start {
            Start::Fresh(repository) => (self.prepare(session, attempt, repository).await?, false),
            Start::Review(plan) => (plan, false),
            Start::Apply(plan) => (plan, true),
        };

        if !approved {
            self.phase(number, Phase::AwaitingReview)?;
            tracing::info!(plan_file = %plan.plan_file.display(), "awaiting plan review");
            let decision = self.review(number).await?;
            if decision.status == ReviewStatus::Discarded {
                tracing::info!(user = %decision.user, "plan discarded");
                return self.finish(number, AttemptOutcome::Discarded);
            }
            self.phase(number, Phase::Applying)?;
        }

        let output = session
            .terraform_apply(ApplyRequest {
                root_dir: self.working_dir(),
                plan_file: plan.plan_file,
            })
            .await?;
        tracing::info!(output_len = output.len(), "plan applied");
        tracing::debug!(%output, "apply output");
        self.finish(number, AttemptOutcome::Applied)
    }

    /// Clone, init and plan inside the session.
    async fn prepare(
        &self,
        session: &Session,
        attempt: &AttemptRecord,
        repository: Repository,
    ) -> Result<PlanArtifact, DeployError> {
        let number = attempt.number;

        self.phase(number, Phase::Cloning)?;
        let root_dir = session
            .clone_repository(CloneRequest {
                repository,
                branch: self.request.branch.clone(),
                revision: attempt.revision.clone(),
                target_dir: self.working_dir(),
            })
            .await?;

        self.phase(number, Phase::Initializing)?;
        session
            .terraform_init(InitRequest {
                root_dir: root_dir.clone(),
            })
            .await?;

        self.phase(number, Phase::Planning)?;
        let plan = session.terraform_plan(PlanRequest { root_dir }).await?;
        tracing::debug!(output = %plan.output, "plan output");

        self.record(Event::AttemptPlanned {
            workflow_id: self.workflow_id.clone(),
            run_id: self.run_id.clone(),
            attempt: number,
            plan: plan.clone(),
        })?;
        Ok(plan)
    }

    async fn review(&mut self, attempt: u64) -> Result<PlanReviewDecision, DeployError> {
        let journal = &self.deps.journal;
        let workflow_id = &self.workflow_id;
        let run_id = &self.run_id;
        let decision = self
            .gate
            .await_decision(attempt, |signal| {
                journal.record(Event::ReviewConsumed {
                    workflow_id: workflow_id.clone(),
                    run_id: run_id.clone(),
                    attempt,
                    user: signal.user.clone(),
                    status: signal.status.clone(),
                })
            })
            .await?;
        Ok(decision)
    }

    fn phase(&self, attempt: u64, phase: Phase) -> Result<(), DeployError> {
        tracing::debug!(%phase, "entering phase");
        self.record(Event::AttemptPhase {
            workflow_id: self.workflow_id.clone(),
            run_id: self.run_id.clone(),
            attempt,
            phase,
        })
    }

    fn finish(&self, attempt: u64, outcome: AttemptOutcome) -> Result<(), DeployError> {
        self.record(Event::AttemptFinished {
            workflow_id: self.workflow_id.clone(),
            run_id: self.run_id.clone(),
            attempt,
            outcome,
        })
    }

    fn record(&self, event: Event) -> Result<(), DeployError> {
        Ok(self.deps.journal.record(event)?)
    }

    fn working_dir(&self) -> PathBuf {
        self.request.working_dir(&self.deps.config.data_dir)
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

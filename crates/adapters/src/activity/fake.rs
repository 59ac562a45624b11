// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake activities for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Activities, ActivityError};
use crate::terraform::plan_file_for;
use crate::vcs::FakeRepositoryClient;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tfg_core::{
    ActivityKind, ApplyRequest, CloneRequest, GetRepositoryRequest, InitRequest, PlanArtifact,
    PlanRequest, Repository, Revision,
};
use tokio::sync::Semaphore;

/// Recorded activity call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityCall {
    GetRepository {
        owner: String,
        name: String,
    },
    Clone {
        url: String,
        branch: String,
        revision: Revision,
        target_dir: PathBuf,
    },
    Init {
        root_dir: PathBuf,
    },
    Plan {
        root_dir: PathBuf,
    },
    Apply {
        root_dir: PathBuf,
        plan_file: PathBuf,
    },
}

impl ActivityCall {
    pub fn kind(&self) -> ActivityKind {
        match self {
            ActivityCall::GetRepository { .. } => ActivityKind::GetRepository,
            ActivityCall::Clone { .. } => ActivityKind::Clone,
            ActivityCall::Init { .. } => ActivityKind::Init,
            ActivityCall::Plan { .. } => ActivityKind::Plan,
            ActivityCall::Apply { .. } => ActivityKind::Apply,
        }
    }
}

#[derive(Default)]
struct FakeActivitiesState {
    calls: Vec<ActivityCall>,
    /// One-shot failures, consumed in order
    failures: HashMap<ActivityKind, VecDeque<ActivityError>>,
    /// Failures returned on every call
    always: HashMap<ActivityKind, ActivityError>,
    delays: HashMap<ActivityKind, Duration>,
    holds: HashMap<ActivityKind, Arc<Semaphore>>,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory activities that record every call.
///
/// Calls succeed unless a failure is scripted. A held kind blocks each
/// call until a matching `release`.
#[derive(Clone, Default)]
pub struct FakeActivities {
    inner: Arc<Mutex<FakeActivitiesState>>,
}

struct InFlight<'a>(&'a Mutex<FakeActivitiesState>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.lock().in_flight -= 1;
    }
}

impl FakeActivities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ActivityCall> {
        self.inner.lock().calls.clone()
    }

    /// Recorded calls of one kind
    pub fn calls_of(&self, kind: ActivityKind) -> Vec<ActivityCall> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.kind() == kind)
            .cloned()
            .collect()
    }

    /// Kinds of all recorded calls, in order
    pub fn kinds(&self) -> Vec<ActivityKind> {
        self.inner.lock().calls.iter().map(ActivityCall::kind).collect()
    }

    /// Fail the next call of `kind` with `error`.
    ///
    /// Repeated calls queue further failures.
    pub fn fail_next(&self, kind: ActivityKind, error: ActivityError) {
        self.inner
            .lock()
            .failures
            .entry(kind)
            .or_default()
            .push_back(error);
    }

    /// Fail every call of `kind` with `error`.
    pub fn fail_always(&self, kind: ActivityKind, error: ActivityError) {
        self.inner.lock().always.insert(kind, error);
    }

    pub fn set_delay(&self, kind: ActivityKind, delay: Duration) {
        self.inner.lock().delays.insert(kind, delay);
    }

    /// Block calls of `kind` until released.
    pub fn hold(&self, kind: ActivityKind) {
        self.inner
            .lock()
            .holds
            .insert(kind, Arc::new(Semaphore::new(0)));
    }

    /// Let one held call of `kind` proceed.
    pub fn release(&self, kind: ActivityKind) {
        if let Some(hold) = self.inner.lock().holds.get(&kind) {
            hold.add_permits(1);
        }
    }

    /// Most calls that were ever executing at the same time
    pub fn max_in_flight(&self) -> usize {
        self.inner.lock().max_in_flight
    }

    async fn enter(&self, call: ActivityCall) -> Result<(), ActivityError> {
        let kind = call.kind();
        let (delay, hold) = {
            let mut inner = self.inner.lock();
            inner.calls.push(call);
            inner.in_flight += 1;
            inner.max_in_flight = inner.max_in_flight.max(inner.in_flight);
            (inner.delays.get(&kind).copied(), inner.holds.get(&kind).cloned())
        };
        let _in_flight = InFlight(&self.inner);

        if let Some(hold) = hold {
            if let Ok(permit) = hold.acquire().await {
                permit.forget();
            }
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock();
        if let Some(err) = inner.failures.get_mut(&kind).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        match inner.always.get(&kind) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Activities for FakeActivities {
    async fn get_repository(
        &self,
        req: GetRepositoryRequest,
    ) -> Result<Repository, ActivityError> {
        self.enter(ActivityCall::GetRepository {
            owner: req.owner.clone(),
            name: req.name.clone(),
        })
        .await?;
        Ok(FakeRepositoryClient::repository(&req.owner, &req.name))
    }

    async fn clone_repository(&self, req: CloneRequest) -> Result<PathBuf, ActivityError> {
        self.enter(ActivityCall::Clone {
            url: req.repository.sanitized_url.clone(),
            branch: req.branch,
            revision: req.revision,
            target_dir: req.target_dir.clone(),
        })
        .await?;
        Ok(req.target_dir)
    }

    async fn terraform_init(&self, req: InitRequest) -> Result<String, ActivityError> {
        self.enter(ActivityCall::Init {
            root_dir: req.root_dir,
        })
        .await?;
        Ok("Terraform has been successfully initialized!\n".to_string())
    }

    async fn terraform_plan(&self, req: PlanRequest) -> Result<PlanArtifact, ActivityError> {
        let plan_file = plan_file_for(&req.root_dir);
        self.enter(ActivityCall::Plan {
            root_dir: req.root_dir,
        })
        .await?;
        Ok(PlanArtifact {
            output: "Plan: 1 to add, 0 to change, 0 to destroy.\n".to_string(),
            plan_file,
        })
    }

    async fn terraform_apply(&self, req: ApplyRequest) -> Result<String, ActivityError> {
        self.enter(ActivityCall::Apply {
            root_dir: req.root_dir,
            plan_file: req.plan_file,
        })
        .await?;
        Ok("Apply complete! Resources: 1 added, 0 changed, 0 destroyed.\n".to_string())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

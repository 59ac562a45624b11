// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity executor: retries and schedule-to-close budgets

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tfg_adapters::{Activities, ActivityError};
use tfg_core::{
    ActivityKind, ApplyRequest, CloneRequest, GetRepositoryRequest, InitRequest, PlanArtifact,
    PlanRequest, Repository,
};

/// Exponential backoff between attempts of one activity call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub maximum_interval: Duration,
    /// Total attempts including the first; 0 means unlimited.
    pub maximum_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(100),
            maximum_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            maximum_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `failed + 1`, given `failed` failures so far.
    pub fn delay_after(&self, failed: u32) -> Duration {
        let exp = failed.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exp);
        let capped = secs.min(self.maximum_interval.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.maximum_interval)
    }

    fn allows(&self, failed: u32) -> bool {
        self.maximum_attempts == 0 || failed < self.maximum_attempts
    }
}

/// Issues activity calls with retry and a per-call total-time budget.
///
/// The schedule-to-close budget covers every attempt and every backoff
/// sleep of one call.
#[derive(Clone)]
pub struct ActivityExecutor<A> {
    activities: A,
    retry: RetryPolicy,
    schedule_to_close: Duration,
}

impl<A: Activities> ActivityExecutor<A> {
    pub fn new(activities: A, retry: RetryPolicy, schedule_to_close: Duration) -> Self {
        Self {
            activities,
            retry,
            schedule_to_close,
        }
    }

    pub async fn get_repository(
        &self,
        req: GetRepositoryRequest,
    ) -> Result<Repository, ActivityError> {
        self.run(ActivityKind::GetRepository, || {
            self.activities.get_repository(req.clone())
        })
        .await
    }

    pub async fn clone_repository(&self, req: CloneRequest) -> Result<PathBuf, ActivityError> {
        self.run(ActivityKind::Clone, || {
            self.activities.clone_repository(req.clone())
        })
        .await
    }

    pub async fn terraform_init(&self, req: InitRequest) -> Result<String, ActivityError> {
        self.run(ActivityKind::Init, || self.activities.terraform_init(req.clone()))
            .await
    }

    pub async fn terraform_plan(&self, req: PlanRequest) -> Result<PlanArtifact, ActivityError> {
        self.run(ActivityKind::Plan, || self.activities.terraform_plan(req.clone()))
            .await
    }

    pub async fn terraform_apply(&self, req: ApplyRequest) -> Result<String, ActivityError> {
        self.run(ActivityKind::Apply, || {
            self.activities.terraform_apply(req.clone())
        })
        .await
    }

    async fn run<T, F, Fut>(&self, kind: ActivityKind, call: F) -> Result<T, ActivityError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ActivityError>>,
    {
        let budget = self.schedule_to_close;
        match tokio::time::timeout(budget, self.with_retry(kind, call)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                tracing::error!(activity = %kind, budget_secs = budget.as_secs(), "activity timed out");
                Err(ActivityError::Timeout {
                    activity: kind,
                    after: budget,
                })
            }
        }
    }

    async fn with_retry<T, F, Fut>(&self, kind: ActivityKind, mut call: F) -> Result<T, ActivityError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ActivityError>>,
    {
        let mut failed = 0u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    failed += 1;
                    if !e.is_retryable() || !self.retry.allows(failed) {
                        return Err(e);
                    }
                    let delay = self.retry.delay_after(failed);
                    tracing::warn!(
                        activity = %kind,
                        attempt = failed,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "activity failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

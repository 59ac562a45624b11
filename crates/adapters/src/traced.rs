// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced activity wrapper for consistent observability

use crate::activity::{Activities, ActivityError};
use async_trait::async_trait;
use std::path::PathBuf;
use tfg_core::{
    ApplyRequest, CloneRequest, GetRepositoryRequest, InitRequest, PlanArtifact, PlanRequest,
    Repository,
};
use tracing::Instrument;

/// Wrapper that adds tracing to any Activities implementation
#[derive(Clone)]
pub struct TracedActivities<A> {
    inner: A,
}

impl<A> TracedActivities<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

fn log_result<T>(result: &Result<T, ActivityError>, start: std::time::Instant, done: &str) {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(_) => tracing::info!(elapsed_ms, "{}", done),
        Err(e) => tracing::error!(elapsed_ms, retryable = e.is_retryable(), error = %e, "failed"),
    }
}

#[async_trait]
impl<A: Activities> Activities for TracedActivities<A> {
    async fn get_repository(
        &self,
        req: GetRepositoryRequest,
    ) -> Result<Repository, ActivityError> {
        let span = tracing::info_span!("activity.get_repository", owner = %req.owner, name = %req.name);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.get_repository(req).await;
            if let Ok(repo) = &result {
                tracing::debug!(url = %repo.sanitized_url, "resolved");
            }
            log_result(&result, start, "repository resolved");
            result
        }
        .instrument(span)
        .await
    }

    async fn clone_repository(&self, req: CloneRequest) -> Result<PathBuf, ActivityError> {
        let span = tracing::info_span!(
            "activity.clone",
            url = %req.repository.sanitized_url,
            branch = %req.branch,
            revision = %req.revision,
        );
        async {
            tracing::info!(dir = %req.target_dir.display(), "starting");
            let start = std::time::Instant::now();
            let result = self.inner.clone_repository(req).await;
            log_result(&result, start, "cloned");
            result
        }
        .instrument(span)
        .await
    }

    async fn terraform_init(&self, req: InitRequest) -> Result<String, ActivityError> {
        let span = tracing::info_span!("activity.terraform_init", dir = %req.root_dir.display());
        async {
            let start = std::time::Instant::now();
            let result = self.inner.terraform_init(req).await;
            log_result(&result, start, "initialized");
            result
        }
        .instrument(span)
        .await
    }

    async fn terraform_plan(&self, req: PlanRequest) -> Result<PlanArtifact, ActivityError> {
        let span = tracing::info_span!("activity.terraform_plan", dir = %req.root_dir.display());
        async {
            let start = std::time::Instant::now();
            let result = self.inner.terraform_plan(req).await;
            if let Ok(plan) = &result {
                tracing::debug!(plan_file = %plan.plan_file.display(), output_len = plan.output.len(), "plan written");
            }
            log_result(&result, start, "planned");
            result
        }
        .instrument(span)
        .await
    }

    async fn terraform_apply(&self, req: ApplyRequest) -> Result<String, ActivityError> {
        let span = tracing::info_span!(
            "activity.terraform_apply",
            dir = %req.root_dir.display(),
            plan_file = %req.plan_file.display(),
        );
        async {
            let start = std::time::Instant::now();
            let result = self.inner.terraform_apply(req).await;
            log_result(&result, start, "applied");
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activities backed by a VCS provider and the git / terraform binaries

use super::{Activities, ActivityError};
use crate::git::GitCli;
use crate::terraform::TerraformCli;
use crate::vcs::{ProviderRegistry, VcsError};
use async_trait::async_trait;
use std::path::PathBuf;
use tfg_core::{
    ApplyRequest, CloneRequest, GetRepositoryRequest, InitRequest, PlanArtifact, PlanRequest,
    Repository,
};

#[derive(Clone, Debug)]
pub struct ShellActivities {
    providers: ProviderRegistry,
    provider: String,
    git: GitCli,
    terraform: TerraformCli,
}

impl ShellActivities {
    /// Resolve repositories through `provider` in `providers`.
    pub fn new(providers: ProviderRegistry, provider: impl Into<String>) -> Self {
        Self {
            providers,
            provider: provider.into(),
            git: GitCli::default(),
            terraform: TerraformCli::default(),
        }
    }

    pub fn with_git(mut self, git: GitCli) -> Self {
        self.git = git;
        self
    }

    pub fn with_terraform(mut self, terraform: TerraformCli) -> Self {
        self.terraform = terraform;
        self
    }
}

#[async_trait]
impl Activities for ShellActivities {
    async fn get_repository(
        &self,
        req: GetRepositoryRequest,
    ) -> Result<Repository, ActivityError> {
        let client = self.providers.get(&self.provider).map_err(VcsError::from)?;
        Ok(client.get_repository(&req.owner, &req.name).await?)
    }

    async fn clone_repository(&self, req: CloneRequest) -> Result<PathBuf, ActivityError> {
        self.git.clone_checkout(&req).await
    }

    async fn terraform_init(&self, req: InitRequest) -> Result<String, ActivityError> {
        self.terraform.init(&req.root_dir).await
    }

    async fn terraform_plan(&self, req: PlanRequest) -> Result<PlanArtifact, ActivityError> {
        self.terraform.plan(&req.root_dir).await
    }

    async fn terraform_apply(&self, req: ApplyRequest) -> Result<String, ActivityError> {
        self.terraform.apply(&req.root_dir, &req.plan_file).await
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;

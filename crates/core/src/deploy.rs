// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deploy targets and the artifacts produced while deploying them

use crate::id::WorkflowId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

crate::define_id! {
    /// Opaque commit identifier delivered by a "new commit" notification.
    pub struct Revision;
}

/// Repository owner and name as addressed by the VCS provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

/// The target of an orchestrator instance: one branch of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeployRequest {
    pub repo: RepoRef,
    pub branch: String,
}

impl DeployRequest {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            repo: RepoRef {
                owner: owner.into(),
                name: name.into(),
            },
            branch: branch.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.repo.owner
    }

    pub fn name(&self) -> &str {
        &self.repo.name
    }

    /// Key of the single orchestrator instance allowed for this target.
    pub fn workflow_id(&self) -> WorkflowId {
        WorkflowId::new(format!(
            "{}/{}/{}",
            self.repo.owner, self.repo.name, self.branch
        ))
    }

    /// Working directory for this repository under `data_dir`.
    ///
    /// Shared by every attempt for the same owner/name; the clone step
    /// recreates it from scratch each time.
    pub fn working_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.repo.owner).join(&self.repo.name)
    }
}

/// Repository metadata resolved from the VCS provider.
///
/// `url` may embed credentials; only `sanitized_url` is ever logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub url: String,
    pub sanitized_url: String,
}

const REDACTED: &str = "<redacted>";

impl Repository {
    /// Replace every occurrence of the credentialed clone URL with its
    /// sanitized form, then any stray copy of the secret it embeds.
    pub fn redact(&self, text: &str) -> String {
        if self.url.is_empty() || self.url == self.sanitized_url {
            return text.to_string();
        }
        let text = text.replace(&self.url, &self.sanitized_url);
        match self.url_secret() {
            Some(secret) => text.replace(secret, REDACTED),
            None => text,
        }
    }

    /// Password part of the clone URL's userinfo, as it appears in the URL.
    fn url_secret(&self) -> Option<&str> {
        let (_, rest) = self.url.split_once("://")?;
        let authority = rest.split('/').next()?;
        let (userinfo, _) = authority.rsplit_once('@')?;
        let (_, secret) = userinfo.split_once(':')?;
        Some(secret).filter(|s| !s.is_empty())
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("url", &self.sanitized_url)
            .finish()
    }
}

/// Output of a terraform plan and the plan file it wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanArtifact {
    pub output: String,
    pub plan_file: PathBuf,
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod tests;

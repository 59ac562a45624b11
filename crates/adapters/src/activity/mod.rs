// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The external actions a deploy attempt performs

mod shell;

pub use shell::ShellActivities;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ActivityCall, FakeActivities};

use crate::vcs::VcsError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tfg_core::{
    ActivityKind, ApplyRequest, CloneRequest, GetRepositoryRequest, InitRequest, PlanArtifact,
    PlanRequest, Repository,
};
use thiserror::Error;

/// Errors from activity calls.
///
/// Command strings and output are already redacted when constructed.
#[derive(Debug, Clone, Error)]
pub enum ActivityError {
    #[error("`{command}` exited with {}: {output}", exit_label(.exit_code))]
    Command {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },
    #[error("{0}")]
    Process(String),
    #[error("filesystem error: {0}")]
    Filesystem(String),
    #[error("vcs error: {0}")]
    Vcs(#[from] VcsError),
    #[error("{activity} exceeded its {}s schedule-to-close timeout", .after.as_secs())]
    Timeout {
        activity: ActivityKind,
        after: Duration,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "signal".to_string(),
    }
}

impl ActivityError {
    /// Whether the executor's retry policy may try the call again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ActivityError::Command { .. }
            | ActivityError::Process(_)
            | ActivityError::Filesystem(_) => true,
            ActivityError::Vcs(e) => e.is_retryable(),
            ActivityError::Timeout { .. } => false,
        }
    }
}

/// The four deploy actions plus repository resolution.
///
/// Implementations must be safe to call concurrently for different
/// repositories, and idempotent enough to be retried.
#[async_trait]
pub trait Activities: Clone + Send + Sync + 'static {
    async fn get_repository(&self, req: GetRepositoryRequest)
        -> Result<Repository, ActivityError>;

    /// Returns the directory the repository was cloned into.
    async fn clone_repository(&self, req: CloneRequest) -> Result<PathBuf, ActivityError>;

    /// Returns the combined init output.
    async fn terraform_init(&self, req: InitRequest) -> Result<String, ActivityError>;

    async fn terraform_plan(&self, req: PlanRequest) -> Result<PlanArtifact, ActivityError>;

    /// Returns the combined apply output.
    async fn terraform_apply(&self, req: ApplyRequest) -> Result<String, ActivityError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

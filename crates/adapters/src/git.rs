// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! git clone + checkout

use crate::activity::ActivityError;
use crate::subprocess::{command_line, run_checked, GIT_TIMEOUT};
use std::path::PathBuf;
use tfg_core::CloneRequest;

#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(crate::env::git_program())
    }
}

impl GitCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Recreate the target directory, clone a single branch into it and
    /// check out the requested revision.
    ///
    /// Returns the checkout directory. Errors never contain the
    /// credentialed clone URL.
    pub async fn clone_checkout(&self, req: &CloneRequest) -> Result<PathBuf, ActivityError> {
        let dir = &req.target_dir;
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ActivityError::Filesystem(format!(
                    "removing {}: {}",
                    dir.display(),
                    e
                )))
            }
        }
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            ActivityError::Filesystem(format!("creating {}: {}", dir.display(), e))
        })?;

        let redact = |text: &str| req.repository.redact(text);

        let (cmd, display) = command_line(
            &self.program,
            &[
                "clone".to_string(),
                "--branch".to_string(),
                req.branch.clone(),
                "--single-branch".to_string(),
                req.repository.url.clone(),
                dir.display().to_string(),
            ],
        );
        run_checked(cmd, &display, GIT_TIMEOUT, redact).await?;

        let (mut cmd, display) = command_line(
            &self.program,
            &["checkout".to_string(), req.revision.to_string()],
        );
        cmd.current_dir(dir);
        run_checked(cmd, &display, GIT_TIMEOUT, redact).await?;

        tracing::info!(
            url = %req.repository.sanitized_url,
            branch = %req.branch,
            revision = %req.revision,
            dir = %dir.display(),
            "checked out revision"
        );
        Ok(dir.clone())
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! terraform init / plan / apply

use crate::activity::ActivityError;
use crate::subprocess::{command_line, run_checked, TERRAFORM_TIMEOUT};
use std::path::{Path, PathBuf};
use tfg_core::PlanArtifact;

/// File name of the plan written by `plan` and consumed by `apply`.
pub const PLAN_FILE_NAME: &str = "output.tfplan";

#[derive(Debug, Clone)]
pub struct TerraformCli {
    program: String,
}

impl Default for TerraformCli {
    fn default() -> Self {
        Self::new(crate::env::terraform_program())
    }
}

impl TerraformCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub async fn init(&self, root_dir: &Path) -> Result<String, ActivityError> {
        self.run(root_dir, &["init", "-input=false"]).await
    }

    pub async fn plan(&self, root_dir: &Path) -> Result<PlanArtifact, ActivityError> {
        let plan_file = plan_file_for(root_dir);
        let out = plan_file.display().to_string();
        let output = self
            .run(root_dir, &["plan", "-input=false", "-refresh", "-out", &out])
            .await?;
        Ok(PlanArtifact { output, plan_file })
    }

    pub async fn apply(&self, root_dir: &Path, plan_file: &Path) -> Result<String, ActivityError> {
        let plan = plan_file.display().to_string();
        self.run(root_dir, &["apply", "-input=false", &plan]).await
    }

    async fn run(&self, root_dir: &Path, args: &[&str]) -> Result<String, ActivityError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let (mut cmd, display) = command_line(&self.program, &args);
        cmd.current_dir(root_dir).env("TF_IN_AUTOMATION", "1");
        run_checked(cmd, &display, TERRAFORM_TIMEOUT, str::to_string).await
    }
}

/// Plan file location for a root directory.
pub fn plan_file_for(root_dir: &Path) -> PathBuf {
    root_dir.join(PLAN_FILE_NAME)
}

#[cfg(test)]
#[path = "terraform_tests.rs"]
mod tests;

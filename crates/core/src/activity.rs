// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request types for the external actions a deploy attempt performs

use crate::deploy::{Repository, Revision};
use std::path::PathBuf;

/// Resolve repository metadata from the VCS provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRepositoryRequest {
    pub owner: String,
    pub name: String,
}

/// Recreate `target_dir` and check out `revision` of `branch` into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneRequest {
    pub repository: Repository,
    pub branch: String,
    pub revision: Revision,
    pub target_dir: PathBuf,
}

/// `terraform init` in `root_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    pub root_dir: PathBuf,
}

/// `terraform plan` in `root_dir`, writing a plan file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub root_dir: PathBuf,
}

/// `terraform apply` of a previously written plan file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    pub root_dir: PathBuf,
    pub plan_file: PathBuf,
}

/// Which activity a call belongs to, for logs and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    GetRepository,
    Clone,
    Init,
    Plan,
    Apply,
}

impl ActivityKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActivityKind::GetRepository => "get_repository",
            ActivityKind::Clone => "clone",
            ActivityKind::Init => "terraform_init",
            ActivityKind::Plan => "terraform_plan",
            ActivityKind::Apply => "terraform_apply",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

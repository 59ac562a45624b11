// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: the VCS provider and the git / terraform binaries

pub mod activity;
mod env;
pub mod git;
pub mod subprocess;
pub mod terraform;
pub mod traced;
pub mod vcs;

pub use activity::{Activities, ActivityError, ShellActivities};
pub use git::GitCli;
pub use terraform::{plan_file_for, TerraformCli, PLAN_FILE_NAME};
pub use traced::TracedActivities;
pub use vcs::{
    GithubClient, GithubCredentials, ProviderRegistry, RegistryError, RepositoryClient, VcsError,
    DEFAULT_GITHUB_API,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use activity::{ActivityCall, FakeActivities};
#[cfg(any(test, feature = "test-support"))]
pub use vcs::FakeRepositoryClient;

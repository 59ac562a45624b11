// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tfg-core: domain types for commit-driven terraform deploys

pub mod activity;
pub mod deploy;
pub mod event;
pub mod id;
pub mod review;
pub mod time_fmt;
pub mod workflow;

pub use activity::{
    ActivityKind, ApplyRequest, CloneRequest, GetRepositoryRequest, InitRequest, PlanRequest,
};
pub use deploy::{DeployRequest, PlanArtifact, RepoRef, Repository, Revision};
pub use event::Event;
#[cfg(any(test, feature = "test-support"))]
pub use id::SequentialIdGen;
pub use id::{IdGen, RunId, SessionId, UuidIdGen, WorkflowId};
pub use review::{AttemptReview, PlanReviewDecision, PlanReviewSignal, ReviewStatus, UnknownStatus};
pub use time_fmt::{epoch_ms_now, format_elapsed_ms};
pub use workflow::{AttemptOutcome, Phase, WorkflowStatus};

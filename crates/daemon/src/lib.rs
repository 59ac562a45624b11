// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terraform GitOps daemon library
//!
//! Startup/recovery and the HTTP front door, shared by the `tfgd` binary
//! and its tests.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
pub mod http;
pub mod lifecycle;

pub use http::{router, ApiError, DeployBody, DeployResponse, PlanReviewBody};
pub use lifecycle::{
    startup, startup_with, Config, DaemonActivities, DaemonState, LifecycleError, DEFAULT_LISTEN,
};

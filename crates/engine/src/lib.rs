// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Deploy engine: commit-driven plan / review / apply orchestration

mod dispatcher;
mod error;
mod executor;
mod gate;
mod journal;
mod orchestrator;
mod pending;
mod session;

#[cfg(test)]
mod test_helpers;

pub use dispatcher::Dispatcher;
pub use error::{DeployError, DispatchError, GateError, JournalError, SessionError};
pub use executor::{ActivityExecutor, RetryPolicy};
pub use gate::PlanReviewGate;
pub use journal::Journal;
pub use orchestrator::OrchestratorConfig;
pub use session::{Session, SessionConfig, SessionManager, SessionStats};

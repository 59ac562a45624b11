// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan-review gate

use crate::error::{GateError, JournalError};
use tfg_core::{AttemptReview, PlanReviewDecision, PlanReviewSignal};
use tokio::sync::mpsc;

/// Waits for a recognized review decision on one instance's review channel.
///
/// Signals queue in the channel until the gate reads them, so a decision
/// sent before the plan is ready still counts. Each signal is addressed to
/// one attempt and is dropped by the gate of any other.
pub struct PlanReviewGate {
    rx: mpsc::UnboundedReceiver<AttemptReview>,
}

impl PlanReviewGate {
    pub fn new(rx: mpsc::UnboundedReceiver<AttemptReview>) -> Self {
        Self { rx }
    }

    /// Suspend until an approved or discarded decision for `attempt`
    /// arrives.
    ///
    /// `on_receipt` runs for every signal of `attempt` taken off the
    /// channel, recognized or not. Unknown statuses are logged and skipped.
    /// There is no timeout.
    pub async fn await_decision<F>(
        &mut self,
        attempt: u64,
        mut on_receipt: F,
    ) -> Result<PlanReviewDecision, GateError>
    where
        F: FnMut(&PlanReviewSignal) -> Result<(), JournalError>,
    {
        loop {
            let review = self.rx.recv().await.ok_or(GateError::Closed)?;
            if review.attempt != attempt {
                tracing::warn!(
                    user = %review.signal.user,
                    status = %review.signal.status,
                    addressed = review.attempt,
                    attempt,
                    "dropping review addressed to another attempt"
                );
                continue;
            }
            let signal = review.signal;
            on_receipt(&signal)?;
            match signal.decision() {
                Ok(decision) => {
                    tracing::info!(user = %decision.user, status = %decision.status, "plan reviewed");
                    return Ok(decision);
                }
                Err(e) => {
                    tracing::warn!(user = %signal.user, error = %e, "ignoring plan review");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;

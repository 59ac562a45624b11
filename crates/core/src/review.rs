// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan review decisions delivered by a human reviewer

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Terminal review outcomes the gate recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Approved,
    Discarded,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Approved => "approved",
            ReviewStatus::Discarded => "discarded",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown plan review status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for ReviewStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("approved") {
            Ok(ReviewStatus::Approved)
        } else if s.eq_ignore_ascii_case("discarded") {
            Ok(ReviewStatus::Discarded)
        } else {
            Err(UnknownStatus(s.to_string()))
        }
    }
}

/// A review signal as received from outside, status not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanReviewSignal {
    pub user: String,
    pub status: String,
}

impl PlanReviewSignal {
    pub fn new(user: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            status: status.into(),
        }
    }

    /// Validate the status into a decision.
    pub fn decision(&self) -> Result<PlanReviewDecision, UnknownStatus> {
        Ok(PlanReviewDecision {
            user: self.user.clone(),
            status: self.status.parse()?,
        })
    }
}

/// A review signal addressed to the attempt that was current when it
/// arrived. Only that attempt's gate may act on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptReview {
    pub attempt: u64,
    #[serde(flatten)]
    pub signal: PlanReviewSignal,
}

/// A validated review decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanReviewDecision {
    pub user: String,
    pub status: ReviewStatus,
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tfg_core::ReviewStatus;

fn gate() -> (mpsc::UnboundedSender<AttemptReview>, PlanReviewGate) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, PlanReviewGate::new(rx))
}

fn signal(attempt: u64, user: &str, status: &str) -> AttemptReview {
    AttemptReview {
        attempt,
        signal: PlanReviewSignal::new(user, status),
    }
}

#[tokio::test]
async fn returns_recognized_decision() {
    let (tx, mut gate) = gate();
    tx.send(signal(1, "alice", "Approved")).unwrap();

    let decision = gate.await_decision(1, |_| Ok(())).await.unwrap();

    assert_eq!(decision.user, "alice");
    assert_eq!(decision.status, ReviewStatus::Approved);
}

#[tokio::test]
async fn unknown_status_keeps_waiting() {
    let (tx, mut gate) = gate();
    tx.send(signal(1, "alice", "maybe")).unwrap();

    let waited = tokio::time::timeout(
        Duration::from_millis(50),
        gate.await_decision(1, |_| Ok(())),
    )
    .await;
    assert!(waited.is_err(), "gate returned on an unknown status");

    tx.send(signal(1, "bob", "discarded")).unwrap();
    let decision = gate.await_decision(1, |_| Ok(())).await.unwrap();
    assert_eq!(decision.user, "bob");
    assert_eq!(decision.status, ReviewStatus::Discarded);
}

#[tokio::test]
async fn every_received_signal_is_reported() {
    let (tx, mut gate) = gate();
    tx.send(signal(1, "alice", "rejected")).unwrap();
    tx.send(signal(1, "bob", "approved")).unwrap();
    let mut seen = Vec::new();

    gate.await_decision(1, |s| {
        seen.push(s.status.clone());
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(seen, vec!["rejected".to_string(), "approved".to_string()]);
}

#[tokio::test]
async fn closed_channel_is_an_error() {
    let (tx, mut gate) = gate();
    drop(tx);

    let err = gate.await_decision(1, |_| Ok(())).await.unwrap_err();

    assert!(matches!(err, GateError::Closed));
}

#[tokio::test]
async fn review_for_another_attempt_is_dropped() {
    let (tx, mut gate) = gate();
    tx.send(signal(1, "alice", "approved")).unwrap();
    tx.send(signal(2, "bob", "discarded")).unwrap();
    let mut seen = Vec::new();

    let decision = gate
        .await_decision(2, |s| {
            seen.push(s.user.clone());
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(decision.user, "bob");
    assert_eq!(decision.status, ReviewStatus::Discarded);
    assert_eq!(seen, vec!["bob".to_string()]);
}

#[tokio::test]
async fn stale_approval_alone_does_not_open_the_gate() {
    let (tx, mut gate) = gate();
    tx.send(signal(1, "alice", "approved")).unwrap();

    let waited = tokio::time::timeout(
        Duration::from_millis(50),
        gate.await_decision(2, |_| Ok(())),
    )
    .await;

    assert!(waited.is_err(), "gate returned on a review for attempt 1");
}

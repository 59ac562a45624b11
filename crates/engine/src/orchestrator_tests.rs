// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::session::SessionStats;
use crate::test_helpers::{acme, acme_id, setup, wait_until};
use tfg_adapters::{ActivityCall, ActivityError, VcsError};
use tfg_core::{
    ActivityKind, AttemptOutcome, DeployRequest, Phase, PlanReviewSignal, Revision,
    WorkflowStatus,
};

fn rev(id: &str) -> Revision {
    Revision::new(id)
}

fn balanced(stats: SessionStats, acquired: u64) {
    assert_eq!(
        stats,
        SessionStats {
            acquired,
            released: acquired
        }
    );
}

#[tokio::test]
async fn approved_plan_is_applied_then_instance_completes() {
    let ctx = setup();
    let (workflow_id, run_id) = ctx
        .dispatcher
        .signal_with_start(acme(), rev("abc123"))
        .unwrap();
    assert_eq!(workflow_id, "acme/infra/main");

    ctx.wait_for_review(&workflow_id).await;
    let dir = ctx.data_dir.join("acme").join("infra");
    assert_eq!(
        ctx.activities.kinds(),
        vec![
            ActivityKind::GetRepository,
            ActivityKind::Clone,
            ActivityKind::Init,
            ActivityKind::Plan
        ]
    );
    assert_eq!(
        ctx.activities.calls_of(ActivityKind::Clone),
        vec![ActivityCall::Clone {
            url: "https://bot:<redacted>@github.com/acme/infra.git".to_string(),
            branch: "main".to_string(),
            revision: rev("abc123"),
            target_dir: dir.clone(),
        }]
    );
    assert!(ctx.dispatcher.is_active(workflow_id.as_str()));

    ctx.review(&workflow_id, &run_id, "Approved");
    ctx.wait_for_end(&workflow_id).await;

    assert_eq!(
        ctx.activities.calls_of(ActivityKind::Apply),
        vec![ActivityCall::Apply {
            root_dir: dir.clone(),
            plan_file: dir.join("output.tfplan"),
        }]
    );
    let record = ctx.record(&workflow_id);
    assert_eq!(record.status, WorkflowStatus::Completed);
    assert_eq!(record.last_outcome, Some(AttemptOutcome::Applied));
    assert_eq!(record.last_revision, Some(rev("abc123")));
    assert_eq!(record.attempts_finished, 1);
    balanced(ctx.dispatcher.session_stats(), 1);
}

#[tokio::test]
async fn discarded_plan_is_never_applied() {
    let ctx = setup();
    let (workflow_id, run_id) = ctx
        .dispatcher
        .signal_with_start(acme(), rev("abc123"))
        .unwrap();
    ctx.wait_for_review(&workflow_id).await;

    ctx.review(&workflow_id, &run_id, "Discarded");
    ctx.wait_for_end(&workflow_id).await;

    assert!(ctx.activities.calls_of(ActivityKind::Apply).is_empty());
    let record = ctx.record(&workflow_id);
    assert_eq!(record.status, WorkflowStatus::Completed);
    assert_eq!(record.last_outcome, Some(AttemptOutcome::Discarded));
    balanced(ctx.dispatcher.session_stats(), 1);
}

#[tokio::test]
async fn newest_pending_revision_wins() {
    let ctx = setup();
    ctx.activities.hold(ActivityKind::Clone);
    let (workflow_id, run_id) = ctx.dispatcher.signal_with_start(acme(), rev("r1")).unwrap();
    wait_until("first clone", || {
        !ctx.activities.calls_of(ActivityKind::Clone).is_empty()
    })
    .await;

    let (_, second_run) = ctx.dispatcher.signal_with_start(acme(), rev("r2")).unwrap();
    let (_, third_run) = ctx.dispatcher.signal_with_start(acme(), rev("r3")).unwrap();
    assert_eq!(second_run, run_id);
    assert_eq!(third_run, run_id);
    assert_eq!(ctx.record(&workflow_id).pending, Some(rev("r3")));

    ctx.activities.release(ActivityKind::Clone);
    ctx.wait_for_review(&workflow_id).await;
    ctx.review(&workflow_id, &run_id, "approved");

    wait_until("second clone", || {
        ctx.activities.calls_of(ActivityKind::Clone).len() == 2
    })
    .await;
    ctx.activities.release(ActivityKind::Clone);
    wait_until("second review", || {
        ctx.record(&workflow_id).attempt.is_some_and(|a| a.number == 2 && a.phase == Phase::AwaitingReview)
    })
    .await;
    ctx.review(&workflow_id, &run_id, "approved");
    ctx.wait_for_end(&workflow_id).await;

    let cloned: Vec<Revision> = ctx
        .activities
        .calls_of(ActivityKind::Clone)
        .into_iter()
        .filter_map(|c| match c {
            ActivityCall::Clone { revision, .. } => Some(revision),
            _ => None,
        })
        .collect();
    assert_eq!(cloned, vec![rev("r1"), rev("r3")]);
    assert_eq!(ctx.activities.calls_of(ActivityKind::Apply).len(), 2);
    assert_eq!(ctx.activities.max_in_flight(), 1);
    assert_eq!(ctx.record(&workflow_id).attempts_finished, 2);
    balanced(ctx.dispatcher.session_stats(), 2);
}

#[tokio::test]
async fn revision_during_review_waits_for_current_attempt() {
    let ctx = setup();
    let (workflow_id, run_id) = ctx.dispatcher.signal_with_start(acme(), rev("r1")).unwrap();
    ctx.wait_for_review(&workflow_id).await;

    ctx.dispatcher.signal_with_start(acme(), rev("r2")).unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert_eq!(ctx.activities.calls_of(ActivityKind::Clone).len(), 1);
    let record = ctx.record(&workflow_id);
    assert_eq!(record.attempt.map(|a| a.revision), Some(rev("r1")));
    assert_eq!(record.pending, Some(rev("r2")));

    ctx.review(&workflow_id, &run_id, "discarded");
    wait_until("attempt for r2", || {
        ctx.record(&workflow_id)
            .attempt
            .is_some_and(|a| a.revision == rev("r2") && a.phase == Phase::AwaitingReview)
    })
    .await;
}

#[tokio::test]
async fn extra_approval_is_not_carried_into_the_next_attempt() {
    let ctx = setup();
    ctx.activities.hold(ActivityKind::Apply);
    let (workflow_id, run_id) = ctx.dispatcher.signal_with_start(acme(), rev("r1")).unwrap();
    ctx.wait_for_review(&workflow_id).await;
    ctx.dispatcher.signal_with_start(acme(), rev("r2")).unwrap();

    ctx.review(&workflow_id, &run_id, "approved");
    // Either addressed to attempt 1 or refused once it is applying
    let _ = ctx.dispatcher.signal_review(
        &workflow_id,
        &run_id,
        PlanReviewSignal::new("alice", "approved"),
    );
    wait_until("first apply", || {
        !ctx.activities.calls_of(ActivityKind::Apply).is_empty()
    })
    .await;
    ctx.activities.release(ActivityKind::Apply);

    wait_until("attempt for r2", || {
        ctx.record(&workflow_id)
            .attempt
            .is_some_and(|a| a.revision == rev("r2") && a.phase == Phase::AwaitingReview)
    })
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert_eq!(ctx.phase(&workflow_id), Some(Phase::AwaitingReview));
    assert_eq!(ctx.activities.calls_of(ActivityKind::Apply).len(), 1);
    assert!(ctx.record(&workflow_id).reviews.is_empty());

    ctx.activities.release(ActivityKind::Apply);
    ctx.review(&workflow_id, &run_id, "approved");
    ctx.wait_for_end(&workflow_id).await;
    assert_eq!(ctx.activities.calls_of(ActivityKind::Apply).len(), 2);
}

#[tokio::test]
async fn unknown_review_status_keeps_the_gate_waiting() {
    let ctx = setup();
    let (workflow_id, run_id) = ctx
        .dispatcher
        .signal_with_start(acme(), rev("abc123"))
        .unwrap();
    ctx.wait_for_review(&workflow_id).await;

    ctx.review(&workflow_id, &run_id, "maybe");
    wait_until("review consumed", || ctx.record(&workflow_id).reviews.is_empty()).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert_eq!(ctx.phase(&workflow_id), Some(Phase::AwaitingReview));
    assert!(ctx.activities.calls_of(ActivityKind::Apply).is_empty());

    ctx.review(&workflow_id, &run_id, "approved");
    ctx.wait_for_end(&workflow_id).await;
    assert_eq!(ctx.activities.calls_of(ActivityKind::Apply).len(), 1);
}

#[tokio::test]
async fn review_sent_before_plan_is_buffered() {
    let ctx = setup();
    ctx.activities.hold(ActivityKind::Plan);
    let (workflow_id, run_id) = ctx
        .dispatcher
        .signal_with_start(acme(), rev("abc123"))
        .unwrap();
    wait_until("plan started", || {
        !ctx.activities.calls_of(ActivityKind::Plan).is_empty()
    })
    .await;

    ctx.review(&workflow_id, &run_id, "approved");
    ctx.activities.release(ActivityKind::Plan);
    ctx.wait_for_end(&workflow_id).await;

    assert_eq!(ctx.activities.calls_of(ActivityKind::Apply).len(), 1);
}

#[tokio::test]
async fn failed_step_fails_the_instance_and_releases_the_session() {
    let ctx = setup();
    ctx.activities.fail_always(
        ActivityKind::Init,
        ActivityError::Command {
            command: "terraform init -input=false".to_string(),
            exit_code: Some(1),
            output: "Error: Failed to query available provider packages".to_string(),
        },
    );
    let (workflow_id, _) = ctx
        .dispatcher
        .signal_with_start(acme(), rev("abc123"))
        .unwrap();

    ctx.wait_for_end(&workflow_id).await;

    match ctx.record(&workflow_id).status {
        WorkflowStatus::Failed { error } => {
            assert!(error.contains("terraform_init failed"), "got: {error}");
            assert!(error.contains("Failed to query"), "got: {error}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(ctx.activities.calls_of(ActivityKind::Plan).is_empty());
    balanced(ctx.dispatcher.session_stats(), 1);
}

#[tokio::test]
async fn failed_apply_releases_the_session() {
    let ctx = setup();
    ctx.activities
        .fail_always(ActivityKind::Apply, ActivityError::Process("killed".into()));
    let (workflow_id, run_id) = ctx
        .dispatcher
        .signal_with_start(acme(), rev("abc123"))
        .unwrap();
    ctx.wait_for_review(&workflow_id).await;

    ctx.review(&workflow_id, &run_id, "approved");
    ctx.wait_for_end(&workflow_id).await;

    assert!(matches!(
        ctx.record(&workflow_id).status,
        WorkflowStatus::Failed { .. }
    ));
    balanced(ctx.dispatcher.session_stats(), 1);
}

#[tokio::test]
async fn resolution_failure_never_acquires_a_session() {
    let ctx = setup();
    ctx.activities.fail_always(
        ActivityKind::GetRepository,
        ActivityError::Vcs(VcsError::Status {
            status: 404,
            body: "Not Found".to_string(),
        }),
    );
    let (workflow_id, _) = ctx
        .dispatcher
        .signal_with_start(acme(), rev("abc123"))
        .unwrap();

    ctx.wait_for_end(&workflow_id).await;

    assert_eq!(ctx.activities.kinds(), vec![ActivityKind::GetRepository]);
    assert!(matches!(
        ctx.record(&workflow_id).status,
        WorkflowStatus::Failed { .. }
    ));
    balanced(ctx.dispatcher.session_stats(), 0);
}

#[tokio::test]
async fn commit_after_completion_starts_a_new_run() {
    let ctx = setup();
    let (workflow_id, first_run) = ctx.dispatcher.signal_with_start(acme(), rev("r1")).unwrap();
    ctx.wait_for_review(&workflow_id).await;
    ctx.review(&workflow_id, &first_run, "discarded");
    ctx.wait_for_end(&workflow_id).await;

    let (_, second_run) = ctx.dispatcher.signal_with_start(acme(), rev("r2")).unwrap();

    assert_ne!(first_run, second_run);
    ctx.wait_for_review(&workflow_id).await;
    let record = ctx.record(&workflow_id);
    assert_eq!(record.run_id, second_run);
    assert_eq!(record.attempt.map(|a| a.number), Some(1));
}

#[tokio::test]
async fn different_keys_run_in_parallel() {
    let ctx = setup();
    ctx.activities.hold(ActivityKind::Plan);
    let staging = DeployRequest::new("acme", "infra", "staging");

    ctx.dispatcher.signal_with_start(acme(), rev("r1")).unwrap();
    ctx.dispatcher
        .signal_with_start(staging.clone(), rev("r2"))
        .unwrap();

    wait_until("both plans in flight", || {
        ctx.activities.calls_of(ActivityKind::Plan).len() == 2
    })
    .await;
    assert_eq!(ctx.activities.max_in_flight(), 2);

    ctx.activities.release(ActivityKind::Plan);
    ctx.activities.release(ActivityKind::Plan);
    ctx.wait_for_review(&acme_id()).await;
    ctx.wait_for_review(&staging.workflow_id()).await;
}

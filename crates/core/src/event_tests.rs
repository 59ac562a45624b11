// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

fn wf() -> WorkflowId {
    WorkflowId::new("acme/infra/main")
}

fn run() -> RunId {
    RunId::new("run-1")
}

#[test]
fn serializes_with_type_tag() {
    let event = Event::RevisionReceived {
        workflow_id: wf(),
        run_id: run(),
        revision: Revision::new("abc123"),
    };
    let json: serde_json::Value = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "revision:received");
    assert_eq!(json["workflow_id"], "acme/infra/main");
    assert_eq!(json["revision"], "abc123");
}

#[test]
fn phase_serializes_snake_case() {
    let event = Event::AttemptPhase {
        workflow_id: wf(),
        run_id: run(),
        attempt: 1,
        phase: Phase::AwaitingReview,
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"phase\":\"awaiting_review\""), "got: {}", json);
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn workflow_started_tolerates_missing_timestamp() {
    let json = r#"{"type":"workflow:started","workflow_id":"a/b/c","run_id":"r",
        "request":{"repo":{"owner":"a","name":"b"},"branch":"c"}}"#;
    let event: Event = serde_json::from_str(json).unwrap();
    match event {
        Event::WorkflowStarted { created_at_ms, .. } => assert_eq!(created_at_ms, 0),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn accessors_cover_every_variant() {
    let events = vec![
        Event::WorkflowCompleted {
            workflow_id: wf(),
            run_id: run(),
        },
        Event::AttemptPlanned {
            workflow_id: wf(),
            run_id: run(),
            attempt: 2,
            plan: PlanArtifact {
                output: "Plan: 1 to add".to_string(),
                plan_file: PathBuf::from("/data/acme/infra/output.tfplan"),
            },
        },
        Event::ReviewConsumed {
            workflow_id: wf(),
            run_id: run(),
            attempt: 2,
            user: "alice".to_string(),
            status: "approved".to_string(),
        },
    ];
    for event in events {
        assert_eq!(event.workflow_id(), &wf());
        assert_eq!(event.run_id(), &run());
        assert!(event.log_summary().starts_with(event.name()));
    }
}

#[test]
fn log_summary_omits_plan_output() {
    let event = Event::AttemptPlanned {
        workflow_id: wf(),
        run_id: run(),
        attempt: 1,
        plan: PlanArtifact {
            output: "secret-ish plan text".to_string(),
            plan_file: PathBuf::from("/tmp/output.tfplan"),
        },
    };
    assert!(!event.log_summary().contains("plan text"));
}

#[test]
fn review_received_names_its_attempt() {
    let event = Event::ReviewReceived {
        workflow_id: wf(),
        run_id: run(),
        attempt: 3,
        user: "alice".to_string(),
        status: "approved".to_string(),
    };

    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"review:received\""), "got: {}", json);
    assert!(json.contains("\"attempt\":3"), "got: {}", json);
    assert!(event.log_summary().contains("attempt=3"));
    assert_eq!(serde_json::from_str::<Event>(&json).unwrap(), event);
}

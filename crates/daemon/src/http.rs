// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP front door: translates requests into dispatcher signals.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tfg_adapters::Activities;
use tfg_core::{DeployRequest, IdGen, PlanReviewSignal, RepoRef, Revision, RunId, WorkflowId};
use tfg_engine::{DispatchError, Dispatcher};
use tfg_storage::WorkflowRecord;
use thiserror::Error;
use tracing::{error, info};

/// Body of `POST /api/deploy`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployBody {
    pub revision: String,
    pub repo: RepoRef,
    pub branch: String,
}

/// Response of `POST /api/deploy`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResponse {
    #[serde(rename = "workflowID")]
    pub workflow_id: WorkflowId,
    #[serde(rename = "runID")]
    pub run_id: RunId,
}

/// Body of `POST /api/plan_review`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReviewBody {
    pub user: String,
    pub status: String,
    #[serde(rename = "workflowID")]
    pub workflow_id: WorkflowId,
    #[serde(rename = "runID")]
    pub run_id: RunId,
}

/// Request-time failures; every one surfaces as 500 with its text.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    Body(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

pub fn router<A: Activities, I: IdGen>(dispatcher: Dispatcher<A, I>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/deploy", post(deploy::<A, I>))
        .route("/api/deploy/{owner}/{name}/{*branch}", get(describe::<A, I>))
        .route("/api/plan_review", post(plan_review::<A, I>))
        .with_state(dispatcher)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn deploy<A: Activities, I: IdGen>(
    State(dispatcher): State<Dispatcher<A, I>>,
    body: Result<Json<DeployBody>, JsonRejection>,
) -> Result<(StatusCode, Json<DeployResponse>), ApiError> {
    let Json(body) = body?;
    let request = DeployRequest {
        repo: body.repo,
        branch: body.branch,
    };
    let (workflow_id, run_id) =
        dispatcher.signal_with_start(request, Revision::new(body.revision))?;
    info!(workflow = %workflow_id, run = %run_id, "deploy accepted");
    Ok((
        StatusCode::CREATED,
        Json(DeployResponse {
            workflow_id,
            run_id,
        }),
    ))
}

async fn plan_review<A: Activities, I: IdGen>(
    State(dispatcher): State<Dispatcher<A, I>>,
    body: Result<Json<PlanReviewBody>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = body?;
    dispatcher.signal_review(
        &body.workflow_id,
        &body.run_id,
        PlanReviewSignal::new(body.user, body.status),
    )?;
    Ok(StatusCode::ACCEPTED)
}

async fn describe<A: Activities, I: IdGen>(
    State(dispatcher): State<Dispatcher<A, I>>,
    Path((owner, name, branch)): Path<(String, String, String)>,
) -> Result<Json<WorkflowRecord>, StatusCode> {
    let workflow_id = DeployRequest::new(owner, name, branch).workflow_id();
    dispatcher
        .describe(workflow_id.as_str())
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;

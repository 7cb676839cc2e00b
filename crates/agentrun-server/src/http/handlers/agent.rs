//! Run lifecycle handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::debug;

use agentrun_core::RunSummary;

use crate::http::responses::{
    ApiError, ControlRequest, ControlResponse, StartRequest, StartResponse,
};
use crate::launch::launch_run;
use crate::state::AppState;

/// Start a run for the submitted task.
pub async fn start(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<StartResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::InvalidJson {
        message: e.body_text(),
    })?;
    let task = req.task.unwrap_or_default();

    let run_id = launch_run(&state, &task).await?;
    Ok(Json(StartResponse { run_id }))
}

/// Control bodies are optional; a missing or unparseable body targets the
/// current run.
fn control_target(body: Option<Json<ControlRequest>>) -> ControlRequest {
    body.map(|Json(req)| req).unwrap_or_default()
}

pub async fn pause(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ControlRequest>>,
) -> Json<ControlResponse> {
    let req = control_target(body);
    let outcome = state.control.set_paused(req.run_id.as_ref(), true).await;
    Json(outcome.into())
}

pub async fn resume(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ControlRequest>>,
) -> Json<ControlResponse> {
    let req = control_target(body);
    let outcome = state.control.set_paused(req.run_id.as_ref(), false).await;
    Json(outcome.into())
}

/// Flip between paused and running.
pub async fn toggle(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ControlRequest>>,
) -> Json<ControlResponse> {
    let req = control_target(body);
    let outcome = state.control.pause_or_resume(req.run_id.as_ref()).await;
    Json(outcome.into())
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ControlRequest>>,
) -> Json<ControlResponse> {
    let req = control_target(body);
    let outcome = state.control.stop(req.run_id.as_ref()).await;
    Json(outcome.into())
}

/// Summaries of all runs still held by the registry.
pub async fn list_runs(State(state): State<Arc<AppState>>) -> Json<Vec<RunSummary>> {
    let runs = state.registry.list().await;
    debug!(count = runs.len(), "Listing runs");
    Json(runs)
}

//! Event stream handler.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use tracing::info;

use crate::broker;
use crate::http::responses::StreamQuery;
use crate::state::AppState;

/// Stream a run's events as SSE until its terminal status event.
///
/// Unknown run ids get an empty queue that stays open until it is reclaimed.
pub async fn stream_run(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamQuery>,
) -> impl IntoResponse {
    let queue = state.registry.get(&query.run_id).await;
    info!(run_id = %query.run_id, buffered = queue.len(), "Stream opened");
    broker::serve(&queue)
}

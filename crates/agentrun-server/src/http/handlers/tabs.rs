//! Browser tab discovery handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;

use crate::discovery::TabTarget;
use crate::http::responses::{ResolveTabRequest, ResolveTabResponse, TabsQuery};
use crate::state::AppState;

/// Endpoint from the request, falling back to the configured one.
fn endpoint<'a>(state: &'a AppState, requested: Option<&'a str>) -> &'a str {
    requested
        .filter(|e| !e.trim().is_empty())
        .or(state.config.cdp_url.as_deref())
        .unwrap_or_default()
}

pub async fn list_tabs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TabsQuery>,
) -> Json<Vec<TabTarget>> {
    let endpoint = endpoint(&state, query.endpoint.as_deref());
    Json(state.discovery.list_targets(endpoint).await)
}

pub async fn resolve_tab(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResolveTabRequest>,
) -> Json<ResolveTabResponse> {
    let endpoint = endpoint(&state, req.endpoint.as_deref());
    let socket_url = state.discovery.resolve(&req.label, endpoint).await;
    Json(ResolveTabResponse { socket_url })
}

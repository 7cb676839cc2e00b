//! Debug handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::error;

use crate::http::responses::{ApiError, ComponentsResponse};
use crate::state::AppState;

/// Registered component ids of the settings surface.
pub async fn list_components(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ComponentsResponse>, ApiError> {
    let keys = state.components.keys().map_err(|e| {
        error!(error = %e, "Failed to read component registry");
        ApiError::Internal {
            message: e.to_string(),
        }
    })?;
    Ok(Json(ComponentsResponse {
        count: keys.len(),
        keys,
    }))
}

//! HTTP request and response types.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use agentrun_core::RunId;

use crate::control::ControlOutcome;
use crate::launch::LaunchError;

// ============================================================================
// Agent types
// ============================================================================

/// Request body for the start endpoint.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub task: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub run_id: RunId,
}

/// Optional body of the control endpoints. Without a run id the executing
/// run is targeted, or the newest queued one.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    #[serde(default)]
    pub run_id: Option<RunId>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
    pub ok: bool,
    /// False when there was no active run to act on.
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

impl From<ControlOutcome> for ControlResponse {
    fn from(outcome: ControlOutcome) -> Self {
        Self {
            ok: true,
            applied: outcome.applied(),
            run_id: outcome.run_id,
            paused: outcome.paused,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    pub run_id: RunId,
}

// ============================================================================
// Debug types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentsResponse {
    pub count: usize,
    pub keys: Vec<String>,
}

// ============================================================================
// Browser tab types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TabsQuery {
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveTabRequest {
    pub label: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTabResponse {
    pub socket_url: Option<String>,
}

// ============================================================================
// Error types
// ============================================================================

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// API error that maps to an HTTP status and an `ErrorResponse` body.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid JSON in request body.
    InvalidJson { message: String },
    /// Missing or empty required field.
    MissingField { field: &'static str },
    /// Settings surface is missing a component the operation needs.
    NotReady { component: String },
    /// Internal server error.
    Internal { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, detail) = match self {
            ApiError::InvalidJson { message } => (StatusCode::BAD_REQUEST, message),
            ApiError::MissingField { field } => {
                (StatusCode::BAD_REQUEST, format!("Missing {}", field))
            }
            ApiError::NotReady { component } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Component not found: {}", component),
            ),
            ApiError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<LaunchError> for ApiError {
    fn from(e: LaunchError) -> Self {
        match e {
            LaunchError::EmptyTask => ApiError::MissingField { field: "task" },
            LaunchError::NotReady(component) => ApiError::NotReady { component },
            LaunchError::Component(e) => ApiError::Internal {
                message: e.to_string(),
            },
        }
    }
}

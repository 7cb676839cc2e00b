//! HTTP server for the run controller.
//!
//! Provides endpoints for:
//! - Run lifecycle (`/api/agent/start`, `pause`, `resume`, `toggle`, `stop`)
//! - Event streaming (`/api/agent/stream`)
//! - Run list (`/api/agent/runs`)
//! - Settings surface inspection (`/api/debug/components`)
//! - Browser tab discovery (`/api/browser/tabs`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;


/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Any origin: the UI is served by browser extensions and local dev servers.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Agent routes
        .route("/api/agent/start", post(handlers::start))
        .route("/api/agent/pause", post(handlers::pause))
        .route("/api/agent/resume", post(handlers::resume))
        .route("/api/agent/toggle", post(handlers::toggle))
        .route("/api/agent/stop", post(handlers::stop))
        .route("/api/agent/stream", get(handlers::stream_run))
        .route("/api/agent/runs", get(handlers::list_runs))
        // Debug routes
        .route("/api/debug/components", get(handlers::list_components))
        // Browser routes
        .route("/api/browser/tabs", get(handlers::list_tabs))
        .route("/api/browser/tabs/resolve", post(handlers::resolve_tab))
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

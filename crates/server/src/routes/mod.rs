//! API route handlers for the slideshelf server.

pub mod exports;
pub mod health;
pub mod metrics;
pub mod presentations;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - GET  / - Liveness probe
/// - GET  /api/health - Health check
/// - GET  /api/presentations - List presentations
/// - GET  /api/presentations/{id} - Presentation metadata
/// - POST /api/exports/{presentation_id}/export - Start a PDF export
/// - GET  /api/exports/{job_id}/status - Export job status
/// - GET  /api/exports/{job_id}/download - Download the finished PDF
/// - GET  /api/exports - List export jobs
/// - GET  /api/exports/stream - SSE stream of export job updates
/// - GET  /metrics - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health::root))
        .nest("/api", health::router())
        .nest("/api", presentations::router())
        .nest("/api", exports::router())
        .merge(metrics::router())
        .with_state(state)
}

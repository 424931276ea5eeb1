// crates/server/src/lib.rs
//! Slideshelf server library.
//!
//! This crate provides the Axum-based HTTP server for slideshelf. It serves
//! presentation metadata and runs background PDF export jobs.

pub mod config;
pub mod error;
pub mod exports;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::*;
pub use exports::{ExportManager, ExportSettings};
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, presentations, exports, metrics)
/// - CORS for `cors_origin` with credentials, or any origin for `*`
/// - Request tracing
pub fn create_app(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .merge(api_routes(state))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let layer = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(e) => {
            tracing::warn!(origin, error = %e, "invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

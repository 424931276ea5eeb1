//! API routes for presentation metadata.
//!
//! - GET /presentations: List every presentation in the configured directory
//! - GET /presentations/{id}: Metadata for one presentation

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use slideshelf_core::{Presentation, PresentationList};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/presentations: All presentations with their total count.
async fn list_presentations(State(state): State<Arc<AppState>>) -> ApiResult<Json<PresentationList>> {
    let presentations = state.scanner.scan_all().await?;
    Ok(Json(PresentationList::from(presentations)))
}

/// GET /api/presentations/{id}: One presentation, or 404.
async fn get_presentation(
    State(state): State<Arc<AppState>>,
    Path(presentation_id): Path<String>,
) -> ApiResult<Json<Presentation>> {
    state
        .scanner
        .get_by_id(&presentation_id)
        .await
        .map(Json)
        .ok_or(ApiError::PresentationNotFound(presentation_id))
}

/// Build the presentations router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/presentations", get(list_presentations))
        .route("/presentations/{id}", get(get_presentation))
}

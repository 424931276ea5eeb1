//! API routes for PDF export jobs.
//!
//! - POST /exports/{presentation_id}/export: start an export job
//! - GET /exports/{job_id}/status: current job snapshot
//! - GET /exports/{job_id}/download: the finished PDF
//! - GET /exports: all known jobs
//! - GET /exports/stream: SSE stream of job snapshots

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::io::ReaderStream;

use crate::error::{ApiError, ApiResult};
use crate::exports::{ExportJob, ExportOptions, ExportQuality, ExportStatus};
use crate::state::AppState;

/// Optional body of the create-export request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    /// Output format. Only "pdf" is supported.
    pub format: Option<String>,
    /// "high" (default) or "standard".
    pub quality: Option<String>,
}

impl ExportRequest {
    fn options(&self) -> ApiResult<ExportOptions> {
        let format = self.format.as_deref().unwrap_or("pdf");
        if format != "pdf" {
            return Err(ApiError::BadRequest(format!(
                "Invalid format '{format}'. Valid options: pdf"
            )));
        }

        let quality = match self.quality.as_deref() {
            None => ExportQuality::default(),
            Some(value) => ExportQuality::parse(value).ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Invalid quality '{value}'. Valid options: high, standard"
                ))
            })?,
        };
        Ok(ExportOptions { quality })
    }
}

/// Response for the job status endpoint.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct JobStatusResponse {
    pub job: ExportJob,
}

/// POST /api/exports/{presentation_id}/export: Start a PDF export.
///
/// Returns 201 with the `pending` job immediately; rendering happens in the
/// background. Poll the status endpoint for progress.
async fn create_export(
    State(state): State<Arc<AppState>>,
    Path(presentation_id): Path<String>,
    body: Option<Json<ExportRequest>>,
) -> ApiResult<(StatusCode, Json<ExportJob>)> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let options = request.options()?;

    if state.scanner.get_by_id(&presentation_id).await.is_none() {
        return Err(ApiError::PresentationNotFound(presentation_id));
    }

    let job = state.exports.create_export_job_with(&presentation_id, options);
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/exports/{job_id}/status: Current state of an export job.
async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = state
        .exports
        .get_job_status(&job_id)
        .ok_or(ApiError::JobNotFound(job_id))?;
    Ok(Json(JobStatusResponse { job }))
}

/// GET /api/exports/{job_id}/download: Stream the finished PDF.
///
/// Only `completed` jobs are served. A failed job may have left a partial
/// file on disk; it is never returned.
async fn download(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job = state
        .exports
        .get_job_status(&job_id)
        .ok_or_else(|| ApiError::JobNotFound(job_id.clone()))?;

    match job.status {
        ExportStatus::Completed => {}
        ExportStatus::Failed => {
            return Err(ApiError::NotReady(format!(
                "Export job failed: {}",
                job.error.as_deref().unwrap_or("unknown error")
            )))
        }
        status => {
            return Err(ApiError::NotReady(format!(
                "Export job is {status}, not ready for download"
            )))
        }
    }

    let path = state
        .exports
        .get_pdf_path(&job_id)
        .await
        .ok_or(ApiError::FileMissing)?;
    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::FileMissing
        } else {
            ApiError::Internal(format!("opening {}: {e}", path.display()))
        }
    })?;

    let disposition = format!("attachment; filename=\"{}.pdf\"", job.presentation_id);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// GET /api/exports: All jobs still held in memory, oldest first.
async fn list_exports(State(state): State<Arc<AppState>>) -> Json<Vec<ExportJob>> {
    Json(state.exports.list_jobs())
}

/// GET /api/exports/stream: SSE stream of job snapshots.
async fn stream_exports(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.exports.subscribe();

    let stream = async_stream::stream! {
        let mut rx = rx;
        loop {
            match rx.recv().await {
                Ok(job) => {
                    let json = serde_json::to_string(&job).unwrap_or_default();
                    yield Ok(Event::default().event("job").data(json));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "export stream subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Build the exports router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/exports", get(list_exports))
        .route("/exports/stream", get(stream_exports))
        // One parameter name per segment: the router rejects mixed names.
        .route("/exports/{id}/export", post(create_export))
        .route("/exports/{id}/status", get(job_status))
        .route("/exports/{id}/download", get(download))
}

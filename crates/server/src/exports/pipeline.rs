// crates/server/src/exports/pipeline.rs
//! The render-to-PDF steps for a single export job.

use std::path::PathBuf;
use std::time::Duration;

use slideshelf_core::{
    LaunchOptions, PdfOptions, RenderError, RenderSession, Renderer, Viewport, WaitUntil,
};
use tracing::{debug, warn};

use super::store::JobStore;
use super::types::ExportOptions;

/// DOM marker the viewer renders once slides are on the page.
pub const READINESS_SELECTOR: &str = ".spectacle-v7-slide";

/// Progress checkpoints reported while a job runs.
pub mod progress {
    pub const STARTED: u8 = 10;
    pub const LOADED: u8 = 30;
    pub const READY: u8 = 50;
    pub const CAPTURED: u8 = 90;
}

/// Settings shared by every export pipeline.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Base URL of the presentation viewer.
    pub frontend_url: String,
    /// Directory holding `{job_id}.pdf` artifacts.
    pub exports_dir: PathBuf,
    /// Load state navigation waits for before the readiness check.
    pub wait_until: WaitUntil,
    pub readiness_selector: String,
    pub readiness_timeout: Duration,
    /// Pause after the readiness marker appears, for entry animations.
    pub settle_delay: Duration,
    pub launch: LaunchOptions,
}

impl ExportSettings {
    pub fn new(frontend_url: impl Into<String>, exports_dir: impl Into<PathBuf>) -> Self {
        Self {
            frontend_url: frontend_url.into(),
            exports_dir: exports_dir.into(),
            wait_until: WaitUntil::default(),
            readiness_selector: READINESS_SELECTOR.to_string(),
            readiness_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(1),
            launch: LaunchOptions::default(),
        }
    }

    /// Print-mode viewer URL for a presentation. The id is encoded as a
    /// single path segment.
    pub fn view_url(&self, presentation_id: &str) -> String {
        format!(
            "{}/view/{}?print=true",
            self.frontend_url.trim_end_matches('/'),
            urlencoding::encode(presentation_id)
        )
    }

    /// Deterministic artifact path for a job.
    pub fn pdf_path(&self, job_id: &str) -> PathBuf {
        self.exports_dir.join(format!("{job_id}.pdf"))
    }
}

/// Render `presentation_id` into the job's PDF path.
///
/// Launches a private session, drives it through navigation, readiness and
/// capture, then closes it. A failed close fails an otherwise successful
/// render; after an earlier failure it is only logged.
/// Returns the number of bytes written.
pub async fn render_pdf(
    renderer: &dyn Renderer,
    settings: &ExportSettings,
    store: &JobStore,
    job_id: &str,
    presentation_id: &str,
    options: ExportOptions,
) -> Result<u64, RenderError> {
    let mut session = renderer.launch(&settings.launch).await?;
    debug!(job_id, renderer = renderer.name(), "render session launched");

    let result = drive(session.as_mut(), settings, store, job_id, presentation_id, options).await;

    match (result, session.close().await) {
        (Ok(_), Err(e)) => Err(e),
        (result, Err(e)) => {
            warn!(job_id, error = %e, "failed to close render session");
            result
        }
        (result, Ok(())) => result,
    }
}

async fn drive(
    session: &mut dyn RenderSession,
    settings: &ExportSettings,
    store: &JobStore,
    job_id: &str,
    presentation_id: &str,
    options: ExportOptions,
) -> Result<u64, RenderError> {
    let viewport = Viewport::presentation().with_scale(options.quality.device_scale_factor());
    session.open_page(viewport).await?;

    let url = settings.view_url(presentation_id);
    session.navigate(&url, settings.wait_until).await?;
    report(store, job_id, progress::LOADED);

    session
        .wait_for_selector(&settings.readiness_selector, settings.readiness_timeout)
        .await?;
    tokio::time::sleep(settings.settle_delay).await;
    report(store, job_id, progress::READY);

    let path = settings.pdf_path(job_id);
    let bytes = session
        .capture_pdf(&path, &PdfOptions::for_viewport(&viewport))
        .await?;
    report(store, job_id, progress::CAPTURED);

    debug!(job_id, path = %path.display(), bytes, "pdf captured");
    Ok(bytes)
}

fn report(store: &JobStore, job_id: &str, progress: u8) {
    store.update(job_id, |job| job.advance(progress));
}

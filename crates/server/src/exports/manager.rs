// crates/server/src/exports/manager.rs
//! Export job lifecycle: creation, background rendering, lookup and eviction.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use slideshelf_core::Renderer;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, error, info, warn};

use super::failure::ExportFailure;
use super::pipeline::{self, progress, ExportSettings};
use super::store::JobStore;
use super::types::{ExportJob, ExportOptions};
use crate::metrics::InFlightExport;

/// Owns the job table and spawns one rendering task per job.
///
/// At most `max_concurrent` pipelines render at once; the rest stay
/// `pending` until a slot frees up.
pub struct ExportManager {
    store: Arc<JobStore>,
    renderer: Arc<dyn Renderer>,
    settings: Arc<ExportSettings>,
    permits: Arc<Semaphore>,
}

impl ExportManager {
    pub fn new(renderer: Arc<dyn Renderer>, settings: ExportSettings, max_concurrent: usize) -> Self {
        Self {
            store: Arc::new(JobStore::new()),
            renderer,
            settings: Arc::new(settings),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Create a job with default options. See [`Self::create_export_job_with`].
    pub fn create_export_job(&self, presentation_id: &str) -> ExportJob {
        self.create_export_job_with(presentation_id, ExportOptions::default())
    }

    /// Register a `pending` job and start rendering it in the background.
    ///
    /// Returns the initial snapshot without waiting on any pipeline step.
    /// Must be called from within a Tokio runtime.
    pub fn create_export_job_with(&self, presentation_id: &str, options: ExportOptions) -> ExportJob {
        let job = loop {
            let job = ExportJob::new(ExportJob::generate_id(), presentation_id);
            if self.store.insert_new(job.clone()) {
                break job;
            }
            debug!(job_id = %job.job_id, "export job id collision, regenerating");
        };

        info!(
            job_id = %job.job_id,
            presentation_id,
            quality = ?options.quality,
            "export job created"
        );

        let worker = Worker {
            store: Arc::clone(&self.store),
            renderer: Arc::clone(&self.renderer),
            settings: Arc::clone(&self.settings),
            permits: Arc::clone(&self.permits),
        };
        worker.spawn(job.job_id.clone(), job.presentation_id.clone(), options);

        job
    }

    pub fn get_job_status(&self, job_id: &str) -> Option<ExportJob> {
        self.store.get(job_id)
    }

    /// Path of the job's PDF if the file exists.
    ///
    /// Does not look at job status: a failed capture may leave a partial file
    /// behind, so callers serving downloads must also check for `completed`.
    pub async fn get_pdf_path(&self, job_id: &str) -> Option<PathBuf> {
        if !is_plain_id(job_id) {
            return None;
        }
        let path = self.settings.pdf_path(job_id);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    pub fn list_jobs(&self) -> Vec<ExportJob> {
        self.store.list()
    }

    /// Stream of job snapshots, one per state change.
    pub fn subscribe(&self) -> broadcast::Receiver<ExportJob> {
        self.store.subscribe()
    }

    /// Evict terminal jobs whose `completed_at` is older than `max_age`,
    /// deleting their PDFs. Jobs still running are never touched.
    ///
    /// Returns the number of jobs removed.
    pub async fn cleanup_old_jobs(&self, max_age: Duration) -> usize {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return 0;
        };

        let removed = self
            .store
            .remove_where(|job| job.completed_at.is_some_and(|at| at < cutoff));

        for job in &removed {
            let path = self.settings.pdf_path(&job.job_id);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(job_id = %job.job_id, path = %path.display(), "removed export artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(job_id = %job.job_id, path = %path.display(), error = %e, "failed to remove export artifact"),
            }
        }

        if !removed.is_empty() {
            info!(removed = removed.len(), "cleaned up old export jobs");
        }
        removed.len()
    }
}

/// Job ids are used as file names; reject anything that could leave `exports_dir`.
fn is_plain_id(job_id: &str) -> bool {
    !job_id.is_empty()
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Everything one background pipeline needs, cloned out of the manager.
struct Worker {
    store: Arc<JobStore>,
    renderer: Arc<dyn Renderer>,
    settings: Arc<ExportSettings>,
    permits: Arc<Semaphore>,
}

impl Worker {
    fn spawn(self, job_id: String, presentation_id: String, options: ExportOptions) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let task = tokio::spawn(self.run(job_id.clone(), presentation_id, options));
            // A panicking pipeline must still leave the job terminal. Its
            // metrics guard records the `panicked` outcome while unwinding.
            if let Err(e) = task.await {
                error!(job_id = %job_id, error = %e, "export task aborted");
                store.update(&job_id, |job| job.fail(format!("Export task aborted: {e}")));
            }
        });
    }

    async fn run(self, job_id: String, presentation_id: String, options: ExportOptions) {
        let _permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.store
                    .update(&job_id, |job| job.fail("Export service is shutting down"));
                return;
            }
        };

        let in_flight = InFlightExport::start();
        self.store.update(&job_id, |job| {
            job.start();
            job.advance(progress::STARTED);
        });

        let result = pipeline::render_pdf(
            self.renderer.as_ref(),
            &self.settings,
            &self.store,
            &job_id,
            &presentation_id,
            options,
        )
        .await
        .map_err(|e| {
            error!(
                job_id = %job_id,
                presentation_id = %presentation_id,
                error = %e,
                detail = ?e,
                "export failed"
            );
            ExportFailure::from(e)
        });

        match result {
            Ok(bytes) => {
                self.store.update(&job_id, |job| job.complete());
                let elapsed = in_flight.finish("completed");
                info!(
                    job_id = %job_id,
                    presentation_id = %presentation_id,
                    bytes,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "export completed"
                );
            }
            Err(failure) => {
                self.store.update(&job_id, |job| job.fail(failure.to_string()));
                in_flight.finish(failure.outcome());
            }
        }
    }
}

//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Export job metric definitions
//! - Helper functions for recording export outcomes

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Call once at startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    let mut installed = false;
    PROMETHEUS_HANDLE.get_or_init(|| {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Failed to set global metrics recorder (already set)");
        } else {
            describe_metrics();
            installed = true;
            tracing::info!("Prometheus metrics initialized");
        }
        handle
    });
    installed
}

fn describe_metrics() {
    describe_counter!(
        "export_jobs_total",
        "Export jobs that reached a terminal state, by outcome"
    );
    describe_histogram!(
        "export_duration_seconds",
        "Wall time from pipeline start to terminal state"
    );
    describe_gauge!("export_jobs_in_flight", "Export pipelines currently rendering");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// A pipeline acquired its concurrency permit and started rendering.
pub fn record_export_started() {
    gauge!("export_jobs_in_flight").increment(1.0);
}

/// A pipeline finished.
///
/// # Arguments
/// * `outcome` - `"completed"` or a failure label such as `"readiness_timeout"`
/// * `duration` - time since `record_export_started`
pub fn record_export_finished(outcome: &str, duration: Duration) {
    gauge!("export_jobs_in_flight").decrement(1.0);
    counter!("export_jobs_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("export_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

/// RAII guard for one rendering pipeline.
///
/// Records `"panicked"` on drop unless [`InFlightExport::finish`] ran first,
/// so the in-flight gauge is released even when the pipeline unwinds.
pub struct InFlightExport {
    started: Instant,
    finished: bool,
}

impl InFlightExport {
    pub fn start() -> Self {
        record_export_started();
        Self {
            started: Instant::now(),
            finished: false,
        }
    }

    /// Record the terminal outcome. Returns the elapsed pipeline time.
    pub fn finish(mut self, outcome: &str) -> Duration {
        self.finished = true;
        let elapsed = self.started.elapsed();
        record_export_finished(outcome, elapsed);
        elapsed
    }
}

impl Drop for InFlightExport {
    fn drop(&mut self) {
        if !self.finished {
            record_export_finished("panicked", self.started.elapsed());
        }
    }
}

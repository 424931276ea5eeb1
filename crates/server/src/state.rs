// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use slideshelf_core::PresentationScanner;

use crate::exports::ExportManager;

/// Shared application state accessible from all route handlers.
///
/// Built once in `main` and handed to the router; handlers never reach for
/// globals.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Presentation discovery over the configured directory.
    pub scanner: PresentationScanner,
    /// Export job manager (in-memory, not persisted).
    pub exports: Arc<ExportManager>,
}

impl AppState {
    pub fn new(scanner: PresentationScanner, exports: Arc<ExportManager>) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            scanner,
            exports,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// crates/server/src/exports/mod.rs
//! PDF export jobs.
//!
//! Provides:
//! - `ExportManager`: creates jobs and runs one render pipeline per job
//! - `JobStore`: in-memory job table with change notifications
//! - `ExportJob`: the job snapshot returned by the API
//! - `ExportFailure`: failure reasons and their user-facing messages

pub mod failure;
pub mod manager;
pub mod pipeline;
pub mod store;
pub mod types;

pub use failure::ExportFailure;
pub use manager::ExportManager;
pub use pipeline::{ExportSettings, READINESS_SELECTOR};
pub use store::JobStore;
pub use types::{download_url, ExportJob, ExportOptions, ExportQuality, ExportStatus};

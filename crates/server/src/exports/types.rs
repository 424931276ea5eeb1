// crates/server/src/exports/types.rs
//! Types for the export job system.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix shared by every export job id.
pub const JOB_ID_PREFIX: &str = "export_";

/// Lifecycle of an export job. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to render a presentation to PDF.
///
/// Snapshots of this struct are what the store hands out and what the API
/// returns. Every state change goes through the methods below, which keep
/// the terminal fields consistent:
/// - `download_url` is set iff `status == Completed`
/// - `error` is set iff `status == Failed`
/// - `completed_at` is set once, on the first terminal transition
/// - `progress` never goes down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    pub job_id: String,
    pub presentation_id: String,
    pub status: ExportStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExportJob {
    /// A fresh `pending` job at 0%.
    pub fn new(job_id: impl Into<String>, presentation_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            presentation_id: presentation_id.into(),
            status: ExportStatus::Pending,
            progress: 0,
            download_url: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// `export_` followed by 12 lowercase hex characters.
    pub fn generate_id() -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        format!("{JOB_ID_PREFIX}{}", &hex[..12])
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move a pending job to `processing`.
    pub fn start(&mut self) {
        if self.status == ExportStatus::Pending {
            self.status = ExportStatus::Processing;
        }
    }

    /// Raise progress to `progress` (capped at 100). Lower values are ignored.
    pub fn advance(&mut self, progress: u8) {
        if self.is_terminal() {
            return;
        }
        self.progress = self.progress.max(progress.min(100));
    }

    pub fn complete(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.status = ExportStatus::Completed;
        self.progress = 100;
        self.download_url = Some(download_url(&self.job_id));
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.status = ExportStatus::Failed;
        self.download_url = None;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}

/// API path serving the PDF for `job_id`.
pub fn download_url(job_id: &str) -> String {
    format!("/api/exports/{job_id}/download")
}

/// Rendering quality. Both produce 1920x1080 pages; `High` renders at 2x density.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportQuality {
    #[default]
    High,
    Standard,
}

impl ExportQuality {
    pub fn device_scale_factor(&self) -> f64 {
        match self {
            Self::High => 2.0,
            Self::Standard => 1.0,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Self::High),
            "standard" => Some(Self::Standard),
            _ => None,
        }
    }
}

/// Per-job knobs chosen by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub quality: ExportQuality,
}

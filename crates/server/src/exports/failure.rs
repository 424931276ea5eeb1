// crates/server/src/exports/failure.rs
//! Why an export ended in `failed`, and what the user is told about it.

use std::time::Duration;

use slideshelf_core::RenderError;
use thiserror::Error;

/// Terminal failure reasons for the export pipeline.
///
/// The `Display` text is the sanitized message stored on the job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportFailure {
    #[error("Chromium browser not found. Run: `playwright install chromium`")]
    RendererUnavailable,

    #[error(
        "Browser crashed during export. This may indicate Playwright/Chromium compatibility \
         issues with your system. Try updating Playwright: `playwright install --force chromium`"
    )]
    RendererCrashed,

    #[error(
        "Timed out after {}s waiting for the presentation to render. \
         Check that the frontend is running and the presentation loads.",
        .timeout.as_secs_f64()
    )]
    ReadinessTimeout { timeout: Duration },

    #[error("{0}")]
    Unclassified(String),
}

impl ExportFailure {
    /// Label for the `export_jobs_total{outcome}` metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::RendererUnavailable => "renderer_unavailable",
            Self::RendererCrashed => "renderer_crashed",
            Self::ReadinessTimeout { .. } => "readiness_timeout",
            Self::Unclassified(_) => "failed",
        }
    }
}

impl From<&RenderError> for ExportFailure {
    fn from(err: &RenderError) -> Self {
        match err {
            RenderError::Unavailable(_) => Self::RendererUnavailable,
            RenderError::Crashed(_) => Self::RendererCrashed,
            RenderError::Timeout { timeout, .. } => Self::ReadinessTimeout { timeout: *timeout },
            other => Self::Unclassified(other.to_string()),
        }
    }
}

impl From<RenderError> for ExportFailure {
    fn from(err: RenderError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_message() {
        let failure = ExportFailure::from(RenderError::Unavailable(
            "Executable doesn't exist at /ms-playwright/chromium".to_string(),
        ));
        assert_eq!(failure, ExportFailure::RendererUnavailable);
        assert_eq!(
            failure.to_string(),
            "Chromium browser not found. Run: `playwright install chromium`"
        );
    }

    #[test]
    fn test_crashed_message_differs_from_unavailable() {
        let failure = ExportFailure::from(RenderError::Crashed("renderer exited".to_string()));
        assert_eq!(failure, ExportFailure::RendererCrashed);
        let msg = failure.to_string();
        assert!(msg.starts_with("Browser crashed during export."));
        assert!(msg.contains("playwright install --force chromium"));
    }

    #[test]
    fn test_timeout_message() {
        let failure = ExportFailure::from(RenderError::Timeout {
            selector: ".spectacle-v7-slide".to_string(),
            timeout: Duration::from_secs(10),
        });
        assert_eq!(failure.outcome(), "readiness_timeout");
        let msg = failure.to_string();
        assert!(msg.starts_with("Timed out after 10s"));
        assert!(msg.to_lowercase().contains("timed out"));
    }

    #[test]
    fn test_sub_second_timeout_message() {
        let failure = ExportFailure::from(RenderError::Timeout {
            selector: ".spectacle-v7-slide".to_string(),
            timeout: Duration::from_millis(1500),
        });
        assert!(failure.to_string().starts_with("Timed out after 1.5s waiting"));

        let short = ExportFailure::ReadinessTimeout {
            timeout: Duration::from_millis(50),
        };
        assert!(short.to_string().starts_with("Timed out after 0.05s waiting"));
    }

    #[test]
    fn test_unclassified_is_verbatim() {
        let err = RenderError::Navigation {
            url: "http://localhost:5173/view/welcome?print=true".to_string(),
            message: "net::ERR_CONNECTION_REFUSED".to_string(),
        };
        let expected = err.to_string();
        let failure = ExportFailure::from(err);
        assert_eq!(failure, ExportFailure::Unclassified(expected.clone()));
        assert_eq!(failure.to_string(), expected);
        assert_eq!(failure.outcome(), "failed");
    }
}

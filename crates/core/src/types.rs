// crates/core/src/types.rs
use serde::{Deserialize, Serialize};

/// Metadata for a single presentation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    /// Identifier; the file stem unless the metadata block overrides it.
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of `<Slide>` elements found in the source. Always at least 1.
    pub slide_count: usize,
    pub created_at: String,
    pub updated_at: String,
    /// Path relative to the frontend source root, e.g. `presentations/welcome.tsx`.
    pub file_path: String,
}

/// Response body for the presentation listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationList {
    pub presentations: Vec<Presentation>,
    pub total: usize,
}

impl From<Vec<Presentation>> for PresentationList {
    fn from(presentations: Vec<Presentation>) -> Self {
        Self {
            total: presentations.len(),
            presentations,
        }
    }
}

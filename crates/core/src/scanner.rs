// crates/core/src/scanner.rs
//! Presentation discovery.
//!
//! Scans the presentations directory for deck sources (`.tsx`, `.jsx`, `.ts`,
//! `.js`) and extracts metadata from each file without evaluating it:
//! the `export const metadata = { ... }` block is read with a regex and
//! slides are counted by their `<Slide` tags.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::types::Presentation;
use crate::PRESENTATION_EXTENSIONS;

/// Scans a presentations directory and extracts metadata from deck files.
#[derive(Debug, Clone)]
pub struct PresentationScanner {
    dir: PathBuf,
    metadata_regex: Regex,
    slide_regex: Regex,
}

impl PresentationScanner {
    /// Create a scanner rooted at `dir`.
    ///
    /// # Errors
    /// Returns `ScanError::DirNotFound` if the directory does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ScanError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ScanError::DirNotFound { path: dir });
        }
        Ok(Self {
            dir,
            metadata_regex: Regex::new(r"export\s+const\s+metadata\s*=\s*\{([^}]+)\}")?,
            slide_regex: Regex::new(r"<Slide[\s>]")?,
        })
    }

    /// Parse every presentation in the directory.
    ///
    /// Files are grouped by extension in priority order and sorted by name
    /// within each group. Files that fail to parse are logged and skipped.
    pub async fn scan_all(&self) -> Result<Vec<Presentation>, ScanError> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| ScanError::io(&self.dir, e))?;

        let mut by_ext: HashMap<&'static str, Vec<PathBuf>> = HashMap::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ScanError::io(&self.dir, e))?
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
            if let Some(known) = PRESENTATION_EXTENSIONS.iter().find(|k| **k == ext) {
                by_ext.entry(*known).or_default().push(path);
            }
        }

        let mut presentations = Vec::new();
        for ext in PRESENTATION_EXTENSIONS {
            let Some(mut files) = by_ext.remove(ext) else {
                continue;
            };
            files.sort();
            for path in files {
                match self.parse_file(&path).await {
                    Ok(Some(p)) => presentations.push(p),
                    Ok(None) => debug!(path = %path.display(), "Not a presentation, skipping"),
                    Err(e) => warn!(path = %path.display(), error = %e, "Error parsing presentation"),
                }
            }
        }

        Ok(presentations)
    }

    /// Look up a presentation by id (file stem), trying each extension in order.
    pub async fn get_by_id(&self, presentation_id: &str) -> Option<Presentation> {
        let path = self.get_file_path(presentation_id)?;
        match self.parse_file(&path).await {
            Ok(p) => p,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Error parsing presentation");
                None
            }
        }
    }

    /// Absolute path of the source file for `presentation_id`, if one exists.
    pub fn get_file_path(&self, presentation_id: &str) -> Option<PathBuf> {
        if !is_safe_id(presentation_id) {
            return None;
        }
        PRESENTATION_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{presentation_id}.{ext}")))
            .find(|p| p.is_file())
    }

    /// Parse one file. `Ok(None)` means the file has no metadata block or no slides.
    async fn parse_file(&self, path: &Path) -> Result<Option<Presentation>, ScanError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ScanError::io(path, e))?;

        let metadata = self.extract_metadata(&content);
        if metadata.is_empty() {
            return Ok(None);
        }

        let slide_count = self.count_slides(&content);
        if slide_count == 0 {
            return Ok(None);
        }

        let stat = fs::metadata(path).await.map_err(|e| ScanError::io(path, e))?;
        let modified = stat.modified().ok();
        let created = stat.created().ok().or(modified);

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut metadata = metadata;
        Ok(Some(Presentation {
            id: metadata.remove("id").unwrap_or_else(|| stem.clone()),
            title: metadata
                .remove("title")
                .unwrap_or_else(|| title_from_stem(&stem)),
            description: metadata.remove("description"),
            slide_count,
            created_at: metadata
                .remove("createdAt")
                .unwrap_or_else(|| format_time(created)),
            updated_at: metadata
                .remove("updatedAt")
                .unwrap_or_else(|| format_time(modified)),
            file_path: format!("presentations/{file_name}"),
        }))
    }

    /// Extract `key: value` pairs from the `export const metadata = { ... }` block.
    ///
    /// Only the first block is read, and nested objects are not supported.
    pub fn extract_metadata(&self, content: &str) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        let Some(body) = self
            .metadata_regex
            .captures(content)
            .and_then(|c| c.get(1))
        else {
            return metadata;
        };

        for line in body.as_str().lines() {
            let Some((key, value)) = line.trim().split_once(':') else {
                continue;
            };
            let value = value
                .trim()
                .trim_end_matches(',')
                .trim_matches(|c| c == '"' || c == '\'');
            metadata.insert(key.trim().to_string(), value.to_string());
        }
        metadata
    }

    /// Count `<Slide>` / `<Slide ...>` occurrences.
    pub fn count_slides(&self, content: &str) -> usize {
        self.slide_regex.find_iter(content).count()
    }
}

/// Ids are file stems; anything that could escape the directory is rejected.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '\\']) && id != "." && id != ".."
}

/// `my-first_deck` -> `My First Deck`
fn title_from_stem(stem: &str) -> String {
    stem.replace(['-', '_'], " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_time(time: Option<SystemTime>) -> String {
    time.map(DateTime::<Utc>::from)
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

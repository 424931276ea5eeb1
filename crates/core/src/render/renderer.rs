// crates/core/src/render/renderer.rs
//! Renderer traits defining the browser capability the export pipeline drives.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{LaunchOptions, PdfOptions, RenderError, Viewport, WaitUntil};

/// Something that can start isolated browser sessions.
///
/// Implementations include:
/// - `PlaywrightRenderer`: spawns a Node.js Playwright driver per session
/// - test doubles that script session behavior
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Start a brand-new session. Sessions are never pooled or reused.
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn RenderSession>, RenderError>;

    /// Renderer name for logging (e.g. "playwright-chromium").
    fn name(&self) -> &str;
}

/// One browser instance with a single page.
///
/// Methods must be called in order: `open_page`, then `navigate`, then any
/// number of waits and captures. `close` may be called at any point and more
/// than once.
#[async_trait]
pub trait RenderSession: Send {
    /// Create the browsing context and page with the given viewport.
    async fn open_page(&mut self, viewport: Viewport) -> Result<(), RenderError>;

    /// Load `url` and wait for the given load state.
    async fn navigate(&mut self, url: &str, wait_until: WaitUntil) -> Result<(), RenderError>;

    /// Wait until an element matching `selector` is attached to the DOM.
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Print the page to `path`. Returns the number of bytes written.
    async fn capture_pdf(&mut self, path: &Path, options: &PdfOptions) -> Result<u64, RenderError>;

    /// Release the page, context and browser.
    async fn close(&mut self) -> Result<(), RenderError>;
}

// crates/core/src/render/mod.rs
//! Headless browser rendering.
//!
//! Provides the `Renderer` / `RenderSession` traits used by the export
//! pipeline, and `PlaywrightRenderer`, which drives Chromium through a small
//! Node.js driver process speaking JSON lines over stdio.

pub mod playwright;
pub mod renderer;
pub mod types;

pub use playwright::PlaywrightRenderer;
pub use renderer::{RenderSession, Renderer};
pub use types::{LaunchOptions, PdfOptions, RenderError, Viewport, WaitUntil};

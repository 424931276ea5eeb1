// crates/core/src/lib.rs
//! Core domain for slideshelf.
//!
//! - `scanner` discovers presentation files and extracts their metadata
//! - `render` is the headless-browser capability used to print decks to PDF

pub mod error;
pub mod render;
pub mod scanner;
pub mod types;

pub use error::ScanError;
pub use render::{
    LaunchOptions, PdfOptions, PlaywrightRenderer, RenderError, RenderSession, Renderer,
    Viewport, WaitUntil,
};
pub use scanner::PresentationScanner;
pub use types::{Presentation, PresentationList};

/// Supported presentation source extensions, in lookup priority order.
pub const PRESENTATION_EXTENSIONS: [&str; 4] = ["tsx", "jsx", "ts", "js"];

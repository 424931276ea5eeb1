// crates/core/src/render/types.rs
//! Types shared by all renderer implementations.

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Chromium flags that keep headless rendering stable inside containers and on macOS.
pub const DEFAULT_BROWSER_ARGS: [&str; 5] = [
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-gpu",
];

/// Options for starting a browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
    pub args: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            args: DEFAULT_BROWSER_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Page viewport in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

impl Viewport {
    /// 1920x1080 (16:9) at 2x density.
    pub const fn presentation() -> Self {
        Self {
            width: 1920,
            height: 1080,
            device_scale_factor: 2.0,
        }
    }

    pub fn with_scale(mut self, device_scale_factor: f64) -> Self {
        self.device_scale_factor = device_scale_factor;
        self
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::presentation()
    }
}

/// Load state to wait for after navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    /// No network connections for at least 500 ms.
    #[default]
    NetworkIdle,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "domcontentloaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

impl FromStr for WaitUntil {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "load" => Ok(Self::Load),
            "domcontentloaded" => Ok(Self::DomContentLoaded),
            "networkidle" => Ok(Self::NetworkIdle),
            other => Err(format!(
                "unknown load state `{other}` (expected load, domcontentloaded or networkidle)"
            )),
        }
    }
}

/// PDF page geometry. The page size is explicit so nothing is scaled to A4/Letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfOptions {
    pub width_px: u32,
    pub height_px: u32,
    pub print_background: bool,
    pub margin_px: u32,
    pub prefer_css_page_size: bool,
}

impl PdfOptions {
    /// One viewport-sized page per slide, backgrounds on, no margins.
    pub fn for_viewport(viewport: &Viewport) -> Self {
        Self {
            width_px: viewport.width,
            height_px: viewport.height,
            print_background: true,
            margin_px: 0,
            prefer_css_page_size: false,
        }
    }
}

/// Errors reported by a renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The browser or its driver cannot be started at all.
    #[error("renderer unavailable: {0}")]
    Unavailable(String),

    /// The browser went away while a session was in use.
    #[error("renderer crashed: {0}")]
    Crashed(String),

    #[error("timed out after {}ms waiting for selector `{selector}`", .timeout.as_millis())]
    Timeout { selector: String, timeout: Duration },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("PDF capture failed: {0}")]
    Capture(String),

    #[error("renderer error: {0}")]
    Driver(String),

    #[error("renderer protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

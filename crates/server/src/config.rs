// crates/server/src/config.rs
//! Server configuration from command-line flags and `SLIDESHELF_*` variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueHint};
use slideshelf_core::{LaunchOptions, WaitUntil};

use crate::exports::{ExportSettings, READINESS_SELECTOR};

/// Command-line arguments for the slideshelf binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "slideshelf", version, about = "Presentation browser and PDF export server")]
pub struct Config {
    /// Address to bind.
    #[arg(long, env = "SLIDESHELF_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "SLIDESHELF_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory scanned for presentation sources.
    #[arg(long, env = "SLIDESHELF_PRESENTATIONS_DIR", default_value = "presentations", value_hint = ValueHint::DirPath)]
    pub presentations_dir: PathBuf,

    /// Directory for rendered PDFs. Created at startup if missing.
    #[arg(long, env = "SLIDESHELF_EXPORTS_DIR", default_value = "exports", value_hint = ValueHint::DirPath)]
    pub exports_dir: PathBuf,

    /// Base URL of the presentation viewer the renderer loads.
    #[arg(long, env = "SLIDESHELF_FRONTEND_URL", default_value = "http://localhost:5173", value_hint = ValueHint::Url)]
    pub frontend_url: String,

    /// Origin allowed by CORS (`*` for any).
    #[arg(long, env = "SLIDESHELF_CORS_ORIGIN", default_value = "http://localhost:5173")]
    pub cors_origin: String,

    /// Node.js executable used to run the Playwright driver.
    #[arg(long, env = "SLIDESHELF_NODE_BIN", default_value = "node", value_hint = ValueHint::CommandName)]
    pub node_bin: PathBuf,

    /// Directory the driver runs in; must be able to `require('playwright')`.
    #[arg(long, env = "SLIDESHELF_DRIVER_DIR", value_hint = ValueHint::DirPath)]
    pub driver_dir: Option<PathBuf>,

    /// Load state to reach after navigation: load, domcontentloaded or networkidle.
    #[arg(long, env = "SLIDESHELF_WAIT_UNTIL", default_value = "networkidle")]
    pub wait_until: WaitUntil,

    /// Seconds to wait for slides to appear before failing an export.
    #[arg(long, env = "SLIDESHELF_READINESS_TIMEOUT_SECS", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub readiness_timeout_secs: u64,

    /// Milliseconds to pause after slides appear, before capturing.
    #[arg(long, env = "SLIDESHELF_SETTLE_DELAY_MS", default_value_t = 1000)]
    pub settle_delay_ms: u64,

    /// Maximum number of exports rendering at once.
    #[arg(long, env = "SLIDESHELF_MAX_CONCURRENT_EXPORTS", default_value_t = 2, value_parser = clap::value_parser!(usize))]
    pub max_concurrent_exports: usize,

    /// Hours a finished job and its PDF are kept.
    #[arg(long, env = "SLIDESHELF_JOB_RETENTION_HOURS", default_value_t = 24)]
    pub job_retention_hours: u64,

    /// Seconds between cleanup sweeps.
    #[arg(long, env = "SLIDESHELF_CLEANUP_INTERVAL_SECS", default_value_t = 3600)]
    pub cleanup_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            presentations_dir: PathBuf::from("presentations"),
            exports_dir: PathBuf::from("exports"),
            frontend_url: "http://localhost:5173".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            node_bin: PathBuf::from("node"),
            driver_dir: None,
            wait_until: WaitUntil::NetworkIdle,
            readiness_timeout_secs: 10,
            settle_delay_ms: 1000,
            max_concurrent_exports: 2,
            job_retention_hours: 24,
            cleanup_interval_secs: 3600,
        }
    }
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_hours.saturating_mul(3600))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    /// Pipeline settings derived from this configuration.
    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            frontend_url: self.frontend_url.clone(),
            exports_dir: self.exports_dir.clone(),
            wait_until: self.wait_until,
            readiness_selector: READINESS_SELECTOR.to_string(),
            readiness_timeout: Duration::from_secs(self.readiness_timeout_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            launch: LaunchOptions::default(),
        }
    }
}

// crates/server/src/main.rs
//! Slideshelf server binary.
//!
//! Parses configuration, prepares the exports directory, then serves the API
//! while a background task evicts old export jobs.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use slideshelf_core::{PlaywrightRenderer, PresentationScanner};
use slideshelf_server::{create_app, init_metrics, AppState, Config, ExportManager};
use tracing_subscriber::EnvFilter;

/// Periodically drop finished jobs older than the retention window.
fn spawn_cleanup(exports: Arc<ExportManager>, config: &Config) {
    let retention = config.job_retention();
    let mut interval = tokio::time::interval(config.cleanup_interval());
    tokio::spawn(async move {
        // First tick fires immediately; nothing is old yet.
        interval.tick().await;
        loop {
            interval.tick().await;
            let start = Instant::now();
            let removed = exports.cleanup_old_jobs(retention).await;
            tracing::debug!(
                removed,
                duration_ms = start.elapsed().as_millis() as u64,
                "export cleanup sweep"
            );
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,slideshelf_server=info,slideshelf_core=info".into()),
        )
        .init();

    let config = Config::parse();

    init_metrics();

    tokio::fs::create_dir_all(&config.exports_dir)
        .await
        .with_context(|| format!("creating exports dir {}", config.exports_dir.display()))?;

    let scanner = PresentationScanner::new(&config.presentations_dir)
        .with_context(|| format!("opening presentations dir {}", config.presentations_dir.display()))?;

    let mut renderer = PlaywrightRenderer::new(&config.node_bin);
    if let Some(dir) = &config.driver_dir {
        renderer = renderer.with_working_dir(dir);
    }

    let exports = Arc::new(ExportManager::new(
        Arc::new(renderer),
        config.export_settings(),
        config.max_concurrent_exports,
    ));
    spawn_cleanup(Arc::clone(&exports), &config);

    let state = AppState::new(scanner, exports);
    let app = create_app(state, &config.cors_origin);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(
        %addr,
        presentations = %config.presentations_dir.display(),
        exports = %config.exports_dir.display(),
        frontend = %config.frontend_url,
        "slideshelf listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

//! End-to-end export job tests against a scripted renderer.
//!
//! The renderer never starts a browser: each session follows a script and
//! records launches and closes so tests can check session hygiene.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use slideshelf_core::{
    LaunchOptions, PdfOptions, PresentationScanner, RenderError, RenderSession, Renderer,
    Viewport, WaitUntil,
};
use slideshelf_server::exports::{ExportJob, ExportQuality, ExportStatus};
use slideshelf_server::{create_app, init_metrics, render_metrics, AppState, ExportManager, ExportSettings};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio_stream::StreamExt;
use tower::ServiceExt;

const WELCOME: &str = r#"import { Deck, Slide, Heading } from 'spectacle';

export const metadata = {
  id: 'welcome',
  title: 'Welcome',
};

export default function Welcome() {
  return (
    <Deck>
      <Slide><Heading>Hello</Heading></Slide>
    </Deck>
  );
}
"#;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Script {
    Succeed,
    NavigationFails,
    NeverReady,
    CrashDuringCapture,
    PanicDuringCapture,
    MissingBrowser,
}

const REFUSED_URL: &str = "http://localhost:5173/view/welcome?print=true";

#[derive(Default)]
struct Counters {
    launched: AtomicUsize,
    closed: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

struct ScriptedRenderer {
    script: Script,
    counters: Arc<Counters>,
    /// Navigation blocks until a permit is available.
    gate: Option<Arc<Semaphore>>,
    close_fails: bool,
    scales: Arc<std::sync::Mutex<Vec<f64>>>,
    urls: Arc<std::sync::Mutex<Vec<String>>>,
}

impl ScriptedRenderer {
    fn new(script: Script) -> Self {
        Self {
            script,
            counters: Arc::new(Counters::default()),
            gate: None,
            close_fails: false,
            scales: Arc::default(),
            urls: Arc::default(),
        }
    }

    fn gated(script: Script, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(script)
        }
    }

    /// Sessions report an error from `close` after releasing.
    fn with_failing_close(self) -> Self {
        Self {
            close_fails: true,
            ..self
        }
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn RenderSession>, RenderError> {
        if self.script == Script::MissingBrowser {
            return Err(RenderError::Unavailable(
                "browserType.launch: Executable doesn't exist at /ms-playwright/chromium".to_string(),
            ));
        }
        self.counters.launched.fetch_add(1, Ordering::SeqCst);
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(active, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            script: self.script,
            counters: Arc::clone(&self.counters),
            gate: self.gate.clone(),
            close_fails: self.close_fails,
            scales: Arc::clone(&self.scales),
            urls: Arc::clone(&self.urls),
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedSession {
    script: Script,
    counters: Arc<Counters>,
    gate: Option<Arc<Semaphore>>,
    close_fails: bool,
    scales: Arc<std::sync::Mutex<Vec<f64>>>,
    urls: Arc<std::sync::Mutex<Vec<String>>>,
    closed: bool,
}

#[async_trait]
impl RenderSession for ScriptedSession {
    async fn open_page(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        assert_eq!((viewport.width, viewport.height), (1920, 1080));
        self.scales.lock().unwrap().push(viewport.device_scale_factor);
        Ok(())
    }

    async fn navigate(&mut self, url: &str, wait_until: WaitUntil) -> Result<(), RenderError> {
        assert_eq!(wait_until, WaitUntil::NetworkIdle);
        self.urls.lock().unwrap().push(url.to_string());
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        if self.script == Script::NavigationFails {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: "page.goto: net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<(), RenderError> {
        assert_eq!(selector, ".spectacle-v7-slide");
        if self.script == Script::NeverReady {
            tokio::time::sleep(timeout).await;
            return Err(RenderError::Timeout {
                selector: selector.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn capture_pdf(&mut self, path: &Path, options: &PdfOptions) -> Result<u64, RenderError> {
        assert!(options.print_background);
        assert_eq!(options.margin_px, 0);
        match self.script {
            Script::CrashDuringCapture => {
                tokio::fs::write(path, b"%PDF-1.7\n% partial").await?;
                Err(RenderError::Crashed("renderer exited during `pdf`".to_string()))
            }
            Script::PanicDuringCapture => panic!("renderer state corrupted"),
            _ => {
                let bytes = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF\n";
                tokio::fs::write(path, bytes).await?;
                Ok(bytes.len() as u64)
            }
        }
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        if !self.closed {
            self.closed = true;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            self.counters.active.fetch_sub(1, Ordering::SeqCst);
        }
        if self.close_fails {
            return Err(RenderError::Crashed("browser.close: Target closed".to_string()));
        }
        Ok(())
    }
}

struct Harness {
    _tmp: TempDir,
    exports_dir: std::path::PathBuf,
    manager: Arc<ExportManager>,
    app: Router,
}

fn harness(renderer: ScriptedRenderer, max_concurrent: usize) -> Harness {
    let tmp = TempDir::new().unwrap();
    let decks = tmp.path().join("presentations");
    let exports_dir = tmp.path().join("exports");
    std::fs::create_dir_all(&decks).unwrap();
    std::fs::create_dir_all(&exports_dir).unwrap();
    std::fs::write(decks.join("welcome.tsx"), WELCOME).unwrap();

    let mut settings = ExportSettings::new("http://localhost:5173", &exports_dir);
    settings.readiness_timeout = Duration::from_millis(50);
    settings.settle_delay = Duration::from_millis(5);

    let manager = Arc::new(ExportManager::new(Arc::new(renderer), settings, max_concurrent));
    let scanner = PresentationScanner::new(&decks).unwrap();
    let app = create_app(AppState::new(scanner, Arc::clone(&manager)), "*");

    Harness {
        _tmp: tmp,
        exports_dir,
        manager,
        app,
    }
}

async fn wait_terminal(manager: &ExportManager, job_id: &str) -> ExportJob {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(job) = manager.get_job_status(job_id) {
                if job.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job did not finish in time")
}

async fn wait_status(manager: &ExportManager, job_id: &str, status: ExportStatus) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while manager.get_job_status(job_id).map(|j| j.status) != Some(status) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job never reached the expected status");
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

fn json(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap()
}

/// Reads `data:` payloads off an open SSE response body.
struct EventReader {
    body: axum::body::BodyDataStream,
    buf: String,
}

impl EventReader {
    async fn open(app: &Router) -> Self {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/exports/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        Self {
            body: response.into_body().into_data_stream(),
            buf: String::new(),
        }
    }

    /// Next job snapshot, skipping keep-alive comments.
    async fn next_job(&mut self) -> serde_json::Value {
        loop {
            if let Some(end) = self.buf.find("\n\n") {
                let event: String = self.buf.drain(..end + 2).collect();
                if let Some(data) = event.lines().find_map(|l| l.strip_prefix("data:")) {
                    assert!(event.contains("event: job"), "unexpected event: {event}");
                    return serde_json::from_str(data.trim()).unwrap();
                }
                continue;
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), self.body.next())
                .await
                .expect("no event in time")
                .expect("stream ended")
                .unwrap();
            self.buf.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    /// Read until `job_id` reaches a terminal status and return that snapshot.
    async fn until_terminal(&mut self, job_id: &str) -> serde_json::Value {
        loop {
            let job = self.next_job().await;
            if job["jobId"] == job_id && matches!(job["status"].as_str(), Some("completed" | "failed")) {
                return job;
            }
        }
    }
}

#[tokio::test]
async fn test_successful_export_over_http() {
    let h = harness(ScriptedRenderer::new(Script::Succeed), 2);

    let (status, _, body) = send(&h.app, "POST", "/api/exports/welcome/export", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let created = json(&body);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["progress"], 0);
    assert_eq!(created["presentationId"], "welcome");
    let job_id = created["jobId"].as_str().unwrap().to_string();
    assert!(job_id.starts_with("export_"));

    let done = wait_terminal(&h.manager, &job_id).await;
    assert_eq!(done.status, ExportStatus::Completed);
    assert_eq!(done.progress, 100);
    assert_eq!(
        done.download_url.as_deref(),
        Some(format!("/api/exports/{job_id}/download").as_str())
    );
    assert!(done.error.is_none());
    assert!(done.completed_at.is_some());

    let (status, _, body) = send(&h.app, "GET", &format!("/api/exports/{job_id}/status"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["job"]["status"], "completed");

    let (status, headers, body) =
        send(&h.app, "GET", &format!("/api/exports/{job_id}/download"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/pdf");
    assert_eq!(
        headers.get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"welcome.pdf\""
    );
    assert!(body.starts_with(b"%PDF"));

    let path = h.manager.get_pdf_path(&job_id).await.unwrap();
    assert_eq!(path, h.exports_dir.join(format!("{job_id}.pdf")));
    assert!(path.exists());
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_100() {
    let h = harness(ScriptedRenderer::new(Script::Succeed), 2);
    let mut rx = h.manager.subscribe();

    let job = h.manager.create_export_job("welcome");
    let mut seen = Vec::new();
    loop {
        let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timeout waiting for progress")
            .expect("channel error");
        if snapshot.job_id != job.job_id {
            continue;
        }
        seen.push(snapshot.progress);
        if snapshot.is_terminal() {
            assert_eq!(snapshot.status, ExportStatus::Completed);
            break;
        }
    }

    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went down: {seen:?}");
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    for checkpoint in [10, 30, 50, 90] {
        assert!(seen.contains(&checkpoint), "missing {checkpoint} in {seen:?}");
    }
}

#[tokio::test]
async fn test_readiness_timeout_fails_job() {
    let renderer = ScriptedRenderer::new(Script::NeverReady);
    let counters = Arc::clone(&renderer.counters);
    let h = harness(renderer, 2);

    let job = h.manager.create_export_job("welcome");
    let done = wait_terminal(&h.manager, &job.job_id).await;

    assert_eq!(done.status, ExportStatus::Failed);
    assert!(done
        .error
        .as_deref()
        .unwrap()
        .starts_with("Timed out after 0.05s waiting"));
    assert!(done.completed_at.is_some());
    assert!(done.download_url.is_none());
    assert!(done.progress < 100);
    assert!(h.manager.get_pdf_path(&job.job_id).await.is_none());

    assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);

    let (status, _, body) =
        send(&h.app, "GET", &format!("/api/exports/{}/download", job.job_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"]
        .as_str()
        .unwrap()
        .starts_with("Export job failed: Timed out"));
}

#[tokio::test]
async fn test_crash_leaves_partial_file_undownloadable() {
    let renderer = ScriptedRenderer::new(Script::CrashDuringCapture);
    let counters = Arc::clone(&renderer.counters);
    let h = harness(renderer, 2);

    let job = h.manager.create_export_job("welcome");
    let done = wait_terminal(&h.manager, &job.job_id).await;

    assert_eq!(done.status, ExportStatus::Failed);
    assert!(done.error.as_deref().unwrap().starts_with("Browser crashed during export."));
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);

    // The partial artifact exists, but the job is not downloadable.
    assert!(h.manager.get_pdf_path(&job.job_id).await.is_some());
    let (status, _, _) =
        send(&h.app, "GET", &format!("/api/exports/{}/download", job.job_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_browser_message() {
    let h = harness(ScriptedRenderer::new(Script::MissingBrowser), 2);

    let job = h.manager.create_export_job("welcome");
    let done = wait_terminal(&h.manager, &job.job_id).await;

    assert_eq!(done.status, ExportStatus::Failed);
    assert_eq!(
        done.error.as_deref(),
        Some("Chromium browser not found. Run: `playwright install chromium`")
    );
}

#[tokio::test]
async fn test_download_while_processing_is_rejected() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(ScriptedRenderer::gated(Script::Succeed, Arc::clone(&gate)), 2);

    let job = h.manager.create_export_job("welcome");
    wait_status(&h.manager, &job.job_id, ExportStatus::Processing).await;

    let (status, _, body) =
        send(&h.app, "GET", &format!("/api/exports/{}/download", job.job_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json(&body)["error"],
        "Export job is processing, not ready for download"
    );

    gate.add_permits(1);
    let done = wait_terminal(&h.manager, &job.job_id).await;
    assert_eq!(done.status, ExportStatus::Completed);
}

#[tokio::test]
async fn test_concurrency_cap_keeps_extra_jobs_pending() {
    let gate = Arc::new(Semaphore::new(0));
    let renderer = ScriptedRenderer::gated(Script::Succeed, Arc::clone(&gate));
    let counters = Arc::clone(&renderer.counters);
    let h = harness(renderer, 1);

    let first = h.manager.create_export_job("welcome");
    let second = h.manager.create_export_job("welcome");
    wait_status(&h.manager, &first.job_id, ExportStatus::Processing).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let waiting = h.manager.get_job_status(&second.job_id).unwrap();
    assert_eq!(waiting.status, ExportStatus::Pending);
    assert_eq!(waiting.progress, 0);

    gate.add_permits(1);
    assert_eq!(wait_terminal(&h.manager, &first.job_id).await.status, ExportStatus::Completed);
    assert_eq!(wait_terminal(&h.manager, &second.job_id).await.status, ExportStatus::Completed);

    assert_eq!(counters.peak.load(Ordering::SeqCst), 1);
    assert_eq!(counters.launched.load(Ordering::SeqCst), 2);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_standard_quality_uses_1x_scale() {
    let renderer = ScriptedRenderer::new(Script::Succeed);
    let scales = Arc::clone(&renderer.scales);
    let urls = Arc::clone(&renderer.urls);
    let h = harness(renderer, 2);

    let (status, _, body) = send(
        &h.app,
        "POST",
        "/api/exports/welcome/export",
        Some(r#"{"format":"pdf","quality":"standard"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = json(&body)["jobId"].as_str().unwrap().to_string();
    wait_terminal(&h.manager, &job_id).await;

    assert_eq!(*scales.lock().unwrap(), vec![ExportQuality::Standard.device_scale_factor()]);
    assert_eq!(
        *urls.lock().unwrap(),
        vec!["http://localhost:5173/view/welcome?print=true".to_string()]
    );
}

#[tokio::test]
async fn test_completed_at_is_stable() {
    let h = harness(ScriptedRenderer::new(Script::Succeed), 2);
    let job = h.manager.create_export_job("welcome");
    let done = wait_terminal(&h.manager, &job.job_id).await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    let again = h.manager.get_job_status(&job.job_id).unwrap();
    assert_eq!(again.completed_at, done.completed_at);
    assert_eq!(again, done);
}

#[tokio::test]
async fn test_cleanup_removes_finished_jobs_and_files() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(ScriptedRenderer::gated(Script::Succeed, Arc::clone(&gate)), 2);

    let finished = h.manager.create_export_job("welcome");
    gate.add_permits(1);
    wait_terminal(&h.manager, &finished.job_id).await;
    let pdf = h.manager.get_pdf_path(&finished.job_id).await.unwrap();

    // Take the permit back so the next job stays in flight.
    gate.acquire().await.unwrap().forget();
    let running = h.manager.create_export_job("welcome");
    wait_status(&h.manager, &running.job_id, ExportStatus::Processing).await;

    tokio::time::sleep(Duration::from_millis(10)).await;
    let removed = h.manager.cleanup_old_jobs(Duration::ZERO).await;

    assert_eq!(removed, 1);
    assert!(h.manager.get_job_status(&finished.job_id).is_none());
    assert!(!pdf.exists());
    assert_eq!(
        h.manager.get_job_status(&running.job_id).unwrap().status,
        ExportStatus::Processing
    );

    gate.add_permits(1);
    wait_terminal(&h.manager, &running.job_id).await;
}

#[tokio::test]
async fn test_list_exports_includes_created_jobs() {
    let h = harness(ScriptedRenderer::new(Script::Succeed), 2);
    let job = h.manager.create_export_job("welcome");
    wait_terminal(&h.manager, &job.job_id).await;

    let (status, _, body) = send(&h.app, "GET", "/api/exports", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = json(&body);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["jobId"], job.job_id.as_str());
}

#[tokio::test]
async fn test_navigation_error_is_kept_verbatim() {
    let renderer = ScriptedRenderer::new(Script::NavigationFails);
    let counters = Arc::clone(&renderer.counters);
    let h = harness(renderer, 2);

    let job = h.manager.create_export_job("welcome");
    let done = wait_terminal(&h.manager, &job.job_id).await;

    let expected = RenderError::Navigation {
        url: REFUSED_URL.to_string(),
        message: "page.goto: net::ERR_CONNECTION_REFUSED".to_string(),
    }
    .to_string();
    assert_eq!(done.status, ExportStatus::Failed);
    assert_eq!(done.error.as_deref(), Some(expected.as_str()));
    assert_eq!(done.progress, 10);
    assert!(done.download_url.is_none());

    assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    assert!(h.manager.get_pdf_path(&job.job_id).await.is_none());
}

#[tokio::test]
async fn test_close_failure_fails_captured_export() {
    let renderer = ScriptedRenderer::new(Script::Succeed).with_failing_close();
    let counters = Arc::clone(&renderer.counters);
    let h = harness(renderer, 2);

    let job = h.manager.create_export_job("welcome");
    let done = wait_terminal(&h.manager, &job.job_id).await;

    assert_eq!(done.status, ExportStatus::Failed);
    assert!(done.error.as_deref().unwrap().starts_with("Browser crashed during export."));
    assert!(done.download_url.is_none());
    assert!(done.progress < 100);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);

    // The captured file is on disk but the job is not downloadable.
    assert!(h.manager.get_pdf_path(&job.job_id).await.is_some());
    let (status, _, _) =
        send(&h.app, "GET", &format!("/api/exports/{}/download", job.job_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_close_failure_keeps_earlier_error() {
    let renderer = ScriptedRenderer::new(Script::NeverReady).with_failing_close();
    let h = harness(renderer, 2);

    let job = h.manager.create_export_job("welcome");
    let done = wait_terminal(&h.manager, &job.job_id).await;

    assert_eq!(done.status, ExportStatus::Failed);
    assert!(done.error.as_deref().unwrap().starts_with("Timed out after"));
}

#[tokio::test]
async fn test_panicking_pipeline_fails_job_and_records_outcome() {
    init_metrics();
    let h = harness(ScriptedRenderer::new(Script::PanicDuringCapture), 2);

    let job = h.manager.create_export_job("welcome");
    let done = wait_terminal(&h.manager, &job.job_id).await;

    assert_eq!(done.status, ExportStatus::Failed);
    assert!(done.error.as_deref().unwrap().starts_with("Export task aborted"));
    assert!(done.completed_at.is_some());

    let metrics = render_metrics().expect("metrics initialized");
    assert!(metrics.contains(r#"export_jobs_total{outcome="panicked"}"#), "{metrics}");
}

#[tokio::test]
async fn test_stream_delivers_job_snapshots() {
    let h = harness(ScriptedRenderer::new(Script::Succeed), 2);
    let mut events = EventReader::open(&h.app).await;

    let job = h.manager.create_export_job("welcome");

    let first = events.next_job().await;
    assert_eq!(first["jobId"], job.job_id.as_str());
    assert_eq!(first["status"], "pending");

    let done = events.until_terminal(&job.job_id).await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["progress"], 100);
}

#[tokio::test]
async fn test_stream_survives_lagging_subscriber() {
    let h = harness(ScriptedRenderer::new(Script::Succeed), 4);
    let mut events = EventReader::open(&h.app).await;

    // Enough state changes to overflow the unread subscriber.
    let jobs: Vec<_> = (0..60).map(|_| h.manager.create_export_job("welcome")).collect();
    for job in &jobs {
        wait_terminal(&h.manager, &job.job_id).await;
    }

    let late = h.manager.create_export_job("welcome");
    let done = events.until_terminal(&late.job_id).await;
    assert_eq!(done["status"], "completed");
}

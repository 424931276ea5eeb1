// crates/core/src/render/playwright.rs
//! Playwright renderer: spawns a Node.js driver process per session.
//!
//! The driver script is embedded in the binary and passed to `node -e`, so
//! the only runtime requirement is a Node installation that can
//! `require('playwright')` from the configured working directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::renderer::{RenderSession, Renderer};
use super::types::{LaunchOptions, PdfOptions, RenderError, Viewport, WaitUntil};

const DRIVER_SCRIPT: &str = include_str!("driver.js");

/// Playwright's message when the Chromium build is not installed.
const MISSING_EXECUTABLE: &str = "Executable doesn't exist";
/// Playwright's message when the browser dies under an in-flight call.
const TARGET_CLOSED: &str = "Target page, context or browser has been closed";

/// How long `close` waits for the driver to shut the browser down before killing it.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Renderer backed by Playwright's Chromium.
#[derive(Debug, Clone)]
pub struct PlaywrightRenderer {
    node_bin: PathBuf,
    working_dir: Option<PathBuf>,
    response_timeout: Duration,
}

impl PlaywrightRenderer {
    /// Create a renderer that runs the driver with the given `node` executable.
    pub fn new(node_bin: impl Into<PathBuf>) -> Self {
        Self {
            node_bin: node_bin.into(),
            working_dir: None,
            response_timeout: Duration::from_secs(120),
        }
    }

    /// Directory the driver runs in; `require('playwright')` resolves from here.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Upper bound on any single driver call. A driver that stays silent
    /// longer than this is treated as crashed.
    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    fn spawn_driver(&self) -> Result<PlaywrightSession, RenderError> {
        let mut cmd = Command::new(&self.node_bin);
        cmd.arg("-e")
            .arg(DRIVER_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            tracing::error!(node = %self.node_bin.display(), error = %e, "playwright: failed to spawn driver");
            if e.kind() == std::io::ErrorKind::NotFound {
                RenderError::Unavailable(format!(
                    "node executable `{}` not found: {e}",
                    self.node_bin.display()
                ))
            } else {
                RenderError::Io(e)
            }
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Protocol("failed to capture driver stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RenderError::Protocol("failed to capture driver stdout".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            let pid = child.id();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(pid, "playwright driver: {line}");
                }
            });
        }

        debug!(pid = child.id(), "playwright: driver spawned");

        Ok(PlaywrightSession {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            response_timeout: self.response_timeout,
            closed: false,
        })
    }
}

impl Default for PlaywrightRenderer {
    fn default() -> Self {
        Self::new("node")
    }
}

#[async_trait]
impl Renderer for PlaywrightRenderer {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn RenderSession>, RenderError> {
        let mut session = self.spawn_driver()?;
        let launched = session
            .call(&DriverRequest::Launch {
                headless: options.headless,
                args: &options.args,
            })
            .await
            .and_then(|reply| reply.map_err(|f| f.classify(RenderError::Driver)));

        if let Err(e) = launched {
            if let Err(close_err) = session.close().await {
                debug!(error = %close_err, "playwright: cleanup after failed launch");
            }
            return Err(e);
        }
        Ok(Box::new(session))
    }

    fn name(&self) -> &str {
        "playwright-chromium"
    }
}

/// One driver process: one browser, one context, one page.
struct PlaywrightSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    response_timeout: Duration,
    closed: bool,
}

impl PlaywrightSession {
    async fn call(
        &mut self,
        request: &DriverRequest<'_>,
    ) -> Result<Result<DriverReply, DriverFailure>, RenderError> {
        self.call_within(request, self.response_timeout).await
    }

    /// Send one request and read its reply.
    ///
    /// The outer error is a transport failure (driver gone, garbage on the
    /// pipe); the inner one is an error the driver reported for this request.
    async fn call_within(
        &mut self,
        request: &DriverRequest<'_>,
        limit: Duration,
    ) -> Result<Result<DriverReply, DriverFailure>, RenderError> {
        let op = request.op();
        self.next_id += 1;
        let id = self.next_id;

        let mut line = serde_json::to_string(&Envelope { id, request })
            .map_err(|e| RenderError::Protocol(format!("cannot encode `{op}`: {e}")))?;
        line.push('\n');

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RenderError::Crashed(format!("session already closed before `{op}`")))?;
        if let Err(e) = stdin.write_all(line.as_bytes()).await {
            return Err(RenderError::Crashed(format!("renderer exited before `{op}`: {e}")));
        }
        if let Err(e) = stdin.flush().await {
            return Err(RenderError::Crashed(format!("renderer exited before `{op}`: {e}")));
        }

        let raw = match timeout(limit, self.stdout.next_line()).await {
            Err(_) => {
                return Err(RenderError::Crashed(format!(
                    "renderer did not answer `{op}` within {}s",
                    limit.as_secs()
                )))
            }
            Ok(Err(e)) => return Err(RenderError::Crashed(format!("lost renderer during `{op}`: {e}"))),
            Ok(Ok(None)) => {
                let status = self
                    .child
                    .try_wait()
                    .ok()
                    .flatten()
                    .map(|s| format!(" ({s})"))
                    .unwrap_or_default();
                return Err(RenderError::Crashed(format!(
                    "renderer exited during `{op}`{status}"
                )));
            }
            Ok(Ok(Some(raw))) => raw,
        };

        let reply: DriverReply = serde_json::from_str(&raw).map_err(|e| {
            let preview: String = raw.chars().take(300).collect();
            warn!(op, line = %preview, "playwright: driver returned non-JSON");
            RenderError::Protocol(format!("invalid reply to `{op}`: {e}"))
        })?;

        if reply.id != Some(id) {
            return Err(RenderError::Protocol(format!(
                "reply id {:?} does not match request {id} (`{op}`)",
                reply.id
            )));
        }

        if reply.ok {
            Ok(Ok(reply))
        } else {
            Ok(Err(DriverFailure {
                kind: reply.kind.unwrap_or_default(),
                message: reply.message.unwrap_or_else(|| format!("`{op}` failed")),
            }))
        }
    }
}

#[async_trait]
impl RenderSession for PlaywrightSession {
    async fn open_page(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        self.call(&DriverRequest::OpenPage {
            width: viewport.width,
            height: viewport.height,
            device_scale_factor: viewport.device_scale_factor,
        })
        .await?
        .map(|_| ())
        .map_err(|f| f.classify(RenderError::Driver))
    }

    async fn navigate(&mut self, url: &str, wait_until: WaitUntil) -> Result<(), RenderError> {
        self.call(&DriverRequest::Goto {
            url,
            wait_until: wait_until.as_str(),
        })
        .await?
        .map(|_| ())
        .map_err(|f| {
            f.classify(|message| RenderError::Navigation {
                url: url.to_string(),
                message,
            })
        })
    }

    async fn wait_for_selector(&mut self, selector: &str, wait: Duration) -> Result<(), RenderError> {
        let request = DriverRequest::WaitForSelector {
            selector,
            timeout_ms: wait.as_millis() as u64,
        };
        // The driver enforces `wait`; the pipe deadline only has to outlast it.
        let limit = self.response_timeout.max(wait + Duration::from_secs(5));
        match self.call_within(&request, limit).await? {
            Ok(_) => Ok(()),
            Err(f) if f.kind == "timeout" => Err(RenderError::Timeout {
                selector: selector.to_string(),
                timeout: wait,
            }),
            Err(f) => Err(f.classify(RenderError::Driver)),
        }
    }

    async fn capture_pdf(&mut self, path: &Path, options: &PdfOptions) -> Result<u64, RenderError> {
        self.call(&DriverRequest::Pdf {
            path,
            width_px: options.width_px,
            height_px: options.height_px,
            print_background: options.print_background,
            margin_px: options.margin_px,
            prefer_css_page_size: options.prefer_css_page_size,
        })
        .await?
        .map(|reply| reply.bytes.unwrap_or(0))
        .map_err(|f| f.classify(RenderError::Capture))
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if self.stdin.is_some() {
            match self.call_within(&DriverRequest::Close, CLOSE_GRACE).await {
                Ok(Ok(_)) => {}
                Ok(Err(f)) => debug!(kind = %f.kind, message = %f.message, "playwright: close reported an error"),
                Err(e) => debug!(error = %e, "playwright: close request failed"),
            }
        }
        // EOF tells the driver to exit.
        drop(self.stdin.take());

        match timeout(CLOSE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(%status, "playwright: driver exited");
                Ok(())
            }
            Ok(Err(e)) => Err(RenderError::Io(e)),
            Err(_) => {
                warn!(pid = self.child.id(), "playwright: driver did not exit, killing");
                self.child.kill().await.map_err(RenderError::Io)
            }
        }
    }
}

/// Requests understood by `driver.js`.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
enum DriverRequest<'a> {
    Launch {
        headless: bool,
        args: &'a [String],
    },
    OpenPage {
        width: u32,
        height: u32,
        device_scale_factor: f64,
    },
    Goto {
        url: &'a str,
        wait_until: &'static str,
    },
    WaitForSelector {
        selector: &'a str,
        timeout_ms: u64,
    },
    Pdf {
        path: &'a Path,
        width_px: u32,
        height_px: u32,
        print_background: bool,
        margin_px: u32,
        prefer_css_page_size: bool,
    },
    Close,
}

impl DriverRequest<'_> {
    fn op(&self) -> &'static str {
        match self {
            Self::Launch { .. } => "launch",
            Self::OpenPage { .. } => "open_page",
            Self::Goto { .. } => "goto",
            Self::WaitForSelector { .. } => "wait_for_selector",
            Self::Pdf { .. } => "pdf",
            Self::Close => "close",
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    request: &'a DriverRequest<'a>,
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: Option<u64>,
    ok: bool,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    bytes: Option<u64>,
}

/// An error the driver reported for a single request.
#[derive(Debug)]
struct DriverFailure {
    kind: String,
    message: String,
}

impl DriverFailure {
    /// Map to the renderer taxonomy. Missing browsers and dead targets are
    /// recognized regardless of which call hit them.
    fn classify(self, fallback: impl FnOnce(String) -> RenderError) -> RenderError {
        if self.kind == "unavailable" || self.message.contains(MISSING_EXECUTABLE) {
            RenderError::Unavailable(self.message)
        } else if self.kind == "closed" || self.message.contains(TARGET_CLOSED) {
            RenderError::Crashed(self.message)
        } else if self.kind == "protocol" {
            RenderError::Protocol(self.message)
        } else {
            fallback(self.message)
        }
    }
}

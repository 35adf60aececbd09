// src/core/scanner/render_scanner.rs

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::{FutureExt, StreamExt};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, error, info, warn};

use crate::core::models::RenderReport;

/// Upper bound on the browser's own shutdown handshake.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const WINDOW_WIDTH: u32 = 1920;
const WINDOW_HEIGHT: u32 = 1080;

/// Failure categories of a render attempt. The `Display` form is the
/// diagnostic stored in the snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("LaunchError: {0}")]
    Launch(String),

    #[error("NavigationError: {0}")]
    Navigation(String),

    #[error("TimeoutError: page did not load within {0} ms")]
    Timeout(u128),

    #[error("DriverPanic: {0}")]
    Panic(String),
}

/// What a session reports after a successful navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    pub title: Option<String>,
    pub content_length: usize,
}

/// Starts one isolated browser per render.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError>;
}

/// A live browser instance. `shutdown` consumes the session, so it can only
/// be released once.
#[async_trait]
pub trait BrowserSession: Send {
    async fn open(&mut self, url: &str) -> Result<LoadedPage, RenderError>;

    async fn shutdown(self: Box<Self>);
}

// --- Chromium ---

/// Launches headless Chromium through the DevTools protocol.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    request_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
            .request_timeout(self.request_timeout)
            .build()
            .map_err(RenderError::Launch)?;

        debug!("Launching headless browser.");
        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!(error = %e, "Browser launch failed.");
            RenderError::Launch(e.to_string())
        })?;

        // The handler drives the DevTools connection and must be polled for the
        // browser to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler stopped.");
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn open(&mut self, url: &str) -> Result<LoadedPage, RenderError> {
        let navigation = |e: chromiumoxide::error::CdpError| RenderError::Navigation(e.to_string());

        let page = self.browser.new_page(url).await.map_err(navigation)?;
        page.wait_for_navigation().await.map_err(navigation)?;

        let title = page.get_title().await.map_err(navigation)?;
        let content = page.content().await.map_err(navigation)?;

        if let Err(e) = page.close().await {
            debug!(error = %e, "Closing the page failed.");
        }

        Ok(LoadedPage {
            title,
            content_length: content.chars().count(),
        })
    }

    async fn shutdown(self: Box<Self>) {
        let ChromiumSession {
            mut browser,
            handler_task,
        } = *self;

        release_process(&mut browser, CLOSE_TIMEOUT).await;
        handler_task.abort();
        debug!("Browser released.");
    }
}

/// Process-level controls used to tear a browser down.
#[async_trait]
trait ProcessControl: Send {
    async fn request_close(&mut self) -> Result<(), String>;

    async fn wait_exit(&mut self) -> Result<(), String>;

    async fn force_kill(&mut self) -> Result<(), String>;
}

#[async_trait]
impl ProcessControl for Browser {
    async fn request_close(&mut self) -> Result<(), String> {
        self.close().await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn wait_exit(&mut self) -> Result<(), String> {
        self.wait().await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn force_kill(&mut self) -> Result<(), String> {
        match self.kill().await {
            Some(result) => result.map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }
}

/// Asks the process to close and waits for it to exit. If either step fails
/// or overruns `grace`, the process is killed. Each step is bounded by
/// `grace`, so teardown never takes longer than three times that.
async fn release_process<P>(process: &mut P, grace: Duration)
where
    P: ProcessControl + ?Sized,
{
    let closed = match timeout(grace, process.request_close()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "Browser close command failed.");
            false
        }
        Err(_) => {
            warn!("Browser did not acknowledge close in time.");
            false
        }
    };

    if closed {
        match timeout(grace, process.wait_exit()).await {
            Ok(Ok(())) => {
                debug!("Browser exited.");
                return;
            }
            Ok(Err(e)) => warn!(error = %e, "Waiting for browser exit failed."),
            Err(_) => warn!("Browser did not exit in time."),
        }
    }

    match timeout(grace, process.force_kill()).await {
        Ok(Ok(())) => debug!("Browser process killed."),
        Ok(Err(e)) => error!(error = %e, "Killing the browser process failed."),
        Err(_) => error!("Browser process could not be killed in time."),
    }
}

// --- Probe ---

/// Loads the domain in a fresh browser and reports what rendered.
#[derive(Clone)]
pub struct RenderScanner {
    launcher: Arc<dyn BrowserLauncher>,
    timeout: Duration,
}

impl RenderScanner {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, timeout: Duration) -> Self {
        Self { launcher, timeout }
    }

    /// Never fails: launch errors, navigation errors, timeouts and driver
    /// panics all come back as an unreachable report.
    pub async fn run_render_scan(&self, domain: &str) -> RenderReport {
        let url = format!("https://{}", domain);
        info!(url = %url, "Starting render scan.");

        let (outcome, load_time_ms) = self.render(&url).await;

        match outcome {
            Ok(page) => {
                info!(url = %url, load_time_ms, content_length = page.content_length, "Render scan finished.");
                RenderReport::loaded(page.title, page.content_length, load_time_ms)
            }
            Err(e) => {
                warn!(url = %url, load_time_ms, error = %e, "Render scan failed.");
                RenderReport::failed(e.to_string(), load_time_ms)
            }
        }
    }

    // Acquire, use, release. The elapsed time is taken before the release so
    // browser teardown is not counted as load time.
    async fn render(&self, url: &str) -> (Result<LoadedPage, RenderError>, u64) {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let timeout_ms = self.timeout.as_millis();

        let launched = AssertUnwindSafe(timeout_at(deadline, self.launcher.launch()))
            .catch_unwind()
            .await;

        let mut session = match launched {
            Ok(Ok(Ok(session))) => session,
            Ok(Ok(Err(e))) => return (Err(e), elapsed_ms(start)),
            Ok(Err(_)) => return (Err(RenderError::Timeout(timeout_ms)), elapsed_ms(start)),
            Err(panic) => return (Err(RenderError::Panic(panic_message(panic))), elapsed_ms(start)),
        };

        let opened = AssertUnwindSafe(timeout_at(deadline, session.open(url)))
            .catch_unwind()
            .await;

        let outcome = match opened {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RenderError::Timeout(timeout_ms)),
            Err(panic) => Err(RenderError::Panic(panic_message(panic))),
        };
        let load_time_ms = elapsed_ms(start);

        session.shutdown().await;
        (outcome, load_time_ms)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "browser driver panicked".to_string()
    }
}

//! Local rendering: one headless-browser lifecycle per call.
//!
//! ```text
//! launch ──▶ page ──▶ set content ──▶ wait idle ──▶ measure ──▶ print ──▶ teardown
//! ```
//!
//! [`RenderSession`] owns the ordering and the readiness/timeout policy; the
//! browser itself sits behind [`BrowserEngine`] / [`EnginePage`] so the
//! lifecycle can be exercised without a real Chrome. [`chrome::ChromeEngine`]
//! is the production engine.
//!
//! Everything here is blocking. Callers on an async runtime go through
//! [`crate::provider::local::LocalEngineProvider`], which moves the session
//! onto `spawn_blocking`.

pub mod chrome;

use crate::error::AttemptError;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Interval between two readiness probes.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Viewport handed to the engine at launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Readiness probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageActivity {
    /// `document.readyState == "complete"`.
    pub loaded: bool,
    /// Monotonic count of network requests the page has issued so far.
    pub requests_seen: u64,
    /// Requests issued but not yet finished or failed.
    pub in_flight: u64,
}

/// Launches isolated browser instances.
pub trait BrowserEngine: Send + Sync {
    /// Start a fresh browser with one blank page of the given viewport.
    ///
    /// Every call must yield an independent process/context; nothing is
    /// shared with earlier or concurrent launches.
    fn launch(&self, viewport: Viewport) -> Result<Box<dyn EnginePage>, AttemptError>;
}

/// A page inside a launched browser. Dropping it must release the browser.
pub trait EnginePage: Send {
    /// Replace the page document with `html`.
    fn set_content(&mut self, html: &str) -> Result<(), AttemptError>;

    /// Probe load state and network activity.
    fn activity(&mut self) -> Result<PageActivity, AttemptError>;

    /// Total scroll height of the rendered document in CSS pixels.
    fn scroll_height(&mut self) -> Result<u32, AttemptError>;

    /// Print one page of `width_px × height_px`, backgrounds on, no margins, scale 1.
    fn print_pdf(&mut self, width_px: u32, height_px: u32) -> Result<Vec<u8>, AttemptError>;

    /// Close the page and terminate the browser. Must tolerate repeated calls.
    fn close(&mut self);
}

/// Readiness settings for one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    pub viewport: Viewport,
    /// No new network activity for this long counts as quiescent.
    pub network_idle: Duration,
    /// Hard cap on the readiness wait.
    pub content_timeout: Duration,
}

/// PDF bytes plus the height the page was sized to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedPdf {
    pub bytes: Vec<u8>,
    pub content_height_px: u32,
}

/// Closes the page on every exit path, including unwinding.
struct PageGuard(Box<dyn EnginePage>);

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// One render from launch to teardown.
pub struct RenderSession<'e> {
    engine: &'e dyn BrowserEngine,
    settings: RenderSettings,
}

impl<'e> RenderSession<'e> {
    pub fn new(engine: &'e dyn BrowserEngine, settings: RenderSettings) -> Self {
        Self { engine, settings }
    }

    /// Render `html` to a single-page PDF as tall as the document.
    ///
    /// The scroll height is measured exactly once, after the page is idle,
    /// and that value is used for the export.
    pub fn render(&self, html: &str) -> Result<SizedPdf, AttemptError> {
        let started = Instant::now();
        let mut page = PageGuard(self.engine.launch(self.settings.viewport)?);
        debug!("browser launched in {:?}", started.elapsed());

        page.0.set_content(html)?;
        self.wait_until_idle(page.0.as_mut())?;

        let height = page.0.scroll_height()?;
        if height == 0 {
            return Err(AttemptError::Render("document has zero scroll height".into()));
        }
        debug!("measured content height {}px", height);

        let bytes = page.0.print_pdf(self.settings.viewport.width, height)?;
        if bytes.is_empty() {
            return Err(AttemptError::Render("engine returned an empty PDF".into()));
        }
        debug!(
            "printed {}x{}px → {} bytes in {:?}",
            self.settings.viewport.width,
            height,
            bytes.len(),
            started.elapsed()
        );

        Ok(SizedPdf {
            bytes,
            content_height_px: height,
        })
    }

    /// Block until the page is loaded, no request is in flight and the request
    /// count has been flat for `network_idle`, or fail with `ContentTimeout`
    /// after `content_timeout`.
    fn wait_until_idle(&self, page: &mut dyn EnginePage) -> Result<(), AttemptError> {
        let deadline = Instant::now() + self.settings.content_timeout;
        let mut last_seen: Option<u64> = None;
        let mut quiet_since = Instant::now();

        loop {
            let now = Instant::now();
            let activity = page.activity()?;

            if last_seen != Some(activity.requests_seen) || activity.in_flight > 0 {
                last_seen = Some(activity.requests_seen);
                quiet_since = now;
            }

            if activity.loaded && now.duration_since(quiet_since) >= self.settings.network_idle {
                return Ok(());
            }

            if now >= deadline {
                return Err(AttemptError::ContentTimeout {
                    waited_ms: self.settings.content_timeout.as_millis() as u64,
                });
            }

            thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(now)));
        }
    }
}

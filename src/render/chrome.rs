//! Production [`BrowserEngine`] backed by `headless_chrome`.
//!
//! Each [`ChromeEngine::launch`] starts its own Chrome process with a
//! throw-away profile; the process is killed when the returned page is
//! closed or dropped.
//!
//! Network quiescence comes from DevTools `Network.*` events: every
//! `requestWillBeSent` opens a request, `loadingFinished` / `loadingFailed`
//! close it. A script's pending `fetch()` therefore holds the idle wait open
//! until the response is in.

use super::{BrowserEngine, EnginePage, PageActivity, Viewport};
use crate::error::AttemptError;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::{Network, Page};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// CSS pixels per inch; CDP paper sizes are in inches.
const CSS_PX_PER_INCH: f64 = 96.0;

const LAUNCH_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--hide-scrollbars",
    "--mute-audio",
];

/// True once the load event has fired and every image and web font is in.
const LOAD_PROBE: &str = r#"document.readyState === 'complete'
  && Array.from(document.images).every((img) => img.complete)
  && (!document.fonts || document.fonts.status === 'loaded')"#;

const HEIGHT_PROBE: &str =
    "document.body ? document.body.scrollHeight : document.documentElement.scrollHeight";

/// Launches a fresh headless Chrome per render.
#[derive(Debug, Clone)]
pub struct ChromeEngine {
    /// Explicit executable; `None` defers to `chromium-auto`.
    pub chrome_path: Option<PathBuf>,
    pub no_sandbox: bool,
    /// Upper bound for any single DevTools call.
    pub call_timeout: Duration,
}

impl ChromeEngine {
    pub fn new(chrome_path: Option<PathBuf>, no_sandbox: bool, call_timeout: Duration) -> Self {
        Self {
            chrome_path,
            no_sandbox,
            call_timeout,
        }
    }

    fn executable(&self) -> Result<PathBuf, AttemptError> {
        match &self.chrome_path {
            Some(p) => Ok(p.clone()),
            // Resolved (and possibly downloaded) once per process.
            None => chromium_auto::ensure_chrome_binary(None)
                .map_err(|e| AttemptError::Launch(e.to_string())),
        }
    }
}

impl BrowserEngine for ChromeEngine {
    fn launch(&self, viewport: Viewport) -> Result<Box<dyn EnginePage>, AttemptError> {
        let path = self.executable()?;
        debug!("launching {}", path.display());

        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(!self.no_sandbox)
            .window_size(Some((viewport.width, viewport.height)))
            .path(Some(path))
            .args(LAUNCH_ARGS.iter().map(|a| OsStr::new(*a)).collect())
            .idle_browser_timeout(self.call_timeout * 2)
            .build()
            .map_err(|e| AttemptError::Launch(format!("invalid launch options: {e}")))?;

        let browser = Browser::new(options).map_err(|e| AttemptError::Launch(format!("{e:#}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AttemptError::Launch(format!("could not open a page: {e:#}")))?;
        tab.set_default_timeout(self.call_timeout);

        let network = Arc::new(NetworkTracker::default());
        let sink = Arc::clone(&network);
        tab.add_event_listener(Arc::new(move |event: &Event| sink.on_event(event)))
            .map_err(|e| AttemptError::Launch(format!("could not watch the network: {e:#}")))?;
        tab.call_method(network_enable()?)
            .map_err(|e| AttemptError::Launch(format!("Network.enable failed: {e:#}")))?;

        Ok(Box::new(ChromePage {
            tab: Some(tab),
            browser: Some(browser),
            network,
        }))
    }
}

/// `Network.enable` with every optional buffer limit left at Chrome's default.
fn network_enable() -> Result<Network::Enable, AttemptError> {
    serde_json::from_value(serde_json::json!({}))
        .map_err(|e| AttemptError::Launch(format!("Network.enable params: {e}")))
}

/// Requests the page has opened and not yet finished, keyed by request id.
#[derive(Debug, Default)]
struct NetworkTracker {
    pending: Mutex<HashSet<String>>,
    seen: AtomicU64,
}

impl NetworkTracker {
    fn on_event(&self, event: &Event) {
        match event {
            Event::NetworkRequestWillBeSent(e) => self.started(&e.params.request_id),
            Event::NetworkLoadingFinished(e) => self.settled(&e.params.request_id),
            Event::NetworkLoadingFailed(e) => self.settled(&e.params.request_id),
            _ => {}
        }
    }

    /// Redirects reuse the request id; they count as activity but stay one
    /// pending request.
    fn started(&self, request_id: &str) {
        self.seen.fetch_add(1, Ordering::SeqCst);
        self.lock().insert(request_id.to_string());
    }

    fn settled(&self, request_id: &str) {
        self.lock().remove(request_id);
    }

    /// `(requests seen, requests in flight)`.
    fn snapshot(&self) -> (u64, u64) {
        let in_flight = self.lock().len() as u64;
        (self.seen.load(Ordering::SeqCst), in_flight)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.pending.lock().unwrap_or_else(|p| p.into_inner())
    }
}

struct ChromePage {
    tab: Option<Arc<Tab>>,
    browser: Option<Browser>,
    network: Arc<NetworkTracker>,
}

impl ChromePage {
    fn tab(&self) -> Result<&Arc<Tab>, AttemptError> {
        self.tab
            .as_ref()
            .ok_or_else(|| AttemptError::Render("page already closed".into()))
    }

    fn eval(&self, expression: &str) -> Result<serde_json::Value, AttemptError> {
        self.tab()?
            .evaluate(expression, false)
            .map_err(|e| AttemptError::Render(format!("evaluate failed: {e:#}")))?
            .value
            .ok_or_else(|| AttemptError::Render(format!("no value from `{expression}`")))
    }
}

impl EnginePage for ChromePage {
    fn set_content(&mut self, html: &str) -> Result<(), AttemptError> {
        let tab = self.tab()?;
        // The main frame id equals the target id.
        tab.call_method(Page::SetDocumentContent {
            frame_id: tab.get_target_id().clone(),
            html: html.to_string(),
        })
        .map_err(|e| AttemptError::Render(format!("setDocumentContent failed: {e:#}")))?;
        Ok(())
    }

    fn activity(&mut self) -> Result<PageActivity, AttemptError> {
        let loaded = self.eval(LOAD_PROBE)?.as_bool().unwrap_or(false);
        let (requests_seen, in_flight) = self.network.snapshot();
        Ok(PageActivity {
            loaded,
            requests_seen,
            in_flight,
        })
    }

    fn scroll_height(&mut self) -> Result<u32, AttemptError> {
        let value = self.eval(HEIGHT_PROBE)?;
        value
            .as_f64()
            .filter(|h| h.is_finite() && *h >= 0.0)
            .map(|h| h.ceil() as u32)
            .ok_or_else(|| AttemptError::Render(format!("scroll height is not a number: {value}")))
    }

    fn print_pdf(&mut self, width_px: u32, height_px: u32) -> Result<Vec<u8>, AttemptError> {
        self.tab()?
            .print_to_pdf(Some(pdf_options(width_px, height_px)))
            .map_err(|e| AttemptError::Render(format!("printToPDF failed: {e:#}")))
    }

    fn close(&mut self) {
        if let Some(tab) = self.tab.take() {
            if let Err(e) = tab.close(false) {
                warn!("closing page failed: {e:#}");
            }
        }
        // Dropping the browser kills the Chrome process.
        if self.browser.take().is_some() {
            debug!("browser released");
        }
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        self.close();
    }
}

/// One page exactly `width_px × height_px`, backgrounds on, zero margins.
fn pdf_options(width_px: u32, height_px: u32) -> PrintToPdfOptions {
    PrintToPdfOptions {
        landscape: Some(false),
        display_header_footer: Some(false),
        print_background: Some(true),
        scale: Some(1.0),
        paper_width: Some(f64::from(width_px) / CSS_PX_PER_INCH),
        paper_height: Some(f64::from(height_px) / CSS_PX_PER_INCH),
        margin_top: Some(0.0),
        margin_bottom: Some(0.0),
        margin_left: Some(0.0),
        margin_right: Some(0.0),
        page_ranges: Some("1".to_string()),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RenderSession, RenderSettings};

    #[test]
    fn paper_size_is_viewport_in_inches() {
        let o = pdf_options(1024, 2400);
        assert_eq!(o.paper_width, Some(1024.0 / 96.0));
        assert_eq!(o.paper_height, Some(25.0));
        assert_eq!(o.print_background, Some(true));
        assert_eq!(o.scale, Some(1.0));
        assert_eq!(o.margin_left, Some(0.0));
        assert_eq!(o.page_ranges.as_deref(), Some("1"));
    }

    #[test]
    fn tracker_counts_requests_until_they_finish_or_fail() {
        let t = NetworkTracker::default();
        assert_eq!(t.snapshot(), (0, 0));

        t.started("1");
        t.started("2");
        assert_eq!(t.snapshot(), (2, 2));

        t.settled("1");
        assert_eq!(t.snapshot(), (2, 1));

        // Redirect: same id again, still one pending request.
        t.started("2");
        assert_eq!(t.snapshot(), (3, 1));

        t.settled("2");
        t.settled("unknown");
        assert_eq!(t.snapshot(), (3, 0));
    }

    #[test]
    fn network_enable_params_are_all_defaults() {
        let params = network_enable().expect("params");
        assert_eq!(serde_json::to_value(params).unwrap(), serde_json::json!({}));
    }

    /// Needs a local Chrome; run with `E2E_ENABLED=1`.
    #[test]
    fn renders_with_real_chrome() {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run browser tests");
            return;
        }
        let engine = ChromeEngine::new(None, true, Duration::from_secs(30));
        let settings = RenderSettings {
            viewport: Viewport {
                width: 1024,
                height: 800,
            },
            network_idle: Duration::from_millis(300),
            content_timeout: Duration::from_secs(20),
        };
        let html = r#"<html><body style="margin:0"><div style="height:3000px">tall</div></body></html>"#;
        let pdf = RenderSession::new(&engine, settings)
            .render(html)
            .expect("render with chrome");
        assert!(pdf.bytes.starts_with(b"%PDF"));
        assert_eq!(pdf.content_height_px, 3000);
    }
}

//! PDF providers: the local engine and the remote conversion backends.
//!
//! Every backend implements [`PdfProvider`]. The fallback chain only ever
//! sees [`ProviderDescriptor`]s, which pair a provider with its priority and
//! per-attempt timeout budget.

pub mod gateway;
pub mod html2pdf_app;
pub mod local;

use crate::config::ConversionConfig;
use crate::error::AttemptError;
use crate::output::RenderedPdf;
use crate::render::chrome::ChromeEngine;
use crate::render::{RenderSettings, Viewport};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Priority of the local headless browser.
pub const LOCAL_PRIORITY: i32 = 0;
/// Priority of html2pdf.app.
pub const HTML2PDF_APP_PRIORITY: i32 = 10;
/// Priority of the JSON gateway.
pub const GATEWAY_PRIORITY: i32 = 20;

/// One conversion backend.
///
/// Implementations shape their own request and recognise their own success
/// signal. They never retry: a failure is reported once and the chain moves on.
#[async_trait]
pub trait PdfProvider: Send + Sync {
    /// Stable identifier, unique within a chain.
    fn id(&self) -> &str;

    /// Convert `html` to PDF bytes. `timeout` is the attempt budget; the
    /// chain also enforces it from outside.
    async fn invoke(&self, html: &str, timeout: Duration) -> Result<RenderedPdf, AttemptError>;
}

/// A provider plus the scheduling data the chain needs.
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub id: String,
    /// Lower runs first.
    pub priority: i32,
    pub timeout: Duration,
    pub provider: Arc<dyn PdfProvider>,
}

impl ProviderDescriptor {
    pub fn new(provider: Arc<dyn PdfProvider>, priority: i32, timeout: Duration) -> Self {
        Self {
            id: provider.id().to_string(),
            priority,
            timeout,
            provider,
        }
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ConversionConfig {
    /// Render settings for the local engine.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            viewport: Viewport {
                width: self.viewport_width,
                height: self.viewport_height,
            },
            network_idle: self.network_idle(),
            content_timeout: self.content_timeout(),
        }
    }

    /// Build the provider list in the configured order: local browser,
    /// html2pdf.app, then the gateway. Disabled providers are left out.
    pub fn providers(&self) -> Vec<ProviderDescriptor> {
        let mut out = Vec::with_capacity(3);

        if self.local_enabled {
            let engine = ChromeEngine::new(
                self.chrome_path.clone(),
                self.no_sandbox,
                self.content_timeout(),
            );
            let local = local::LocalEngineProvider::new(Arc::new(engine), self.render_settings());
            out.push(ProviderDescriptor::new(
                Arc::new(local),
                LOCAL_PRIORITY,
                self.local_timeout(),
            ));
        }

        if self.html2pdf_app.enabled {
            let app = html2pdf_app::Html2PdfAppProvider::new(
                self.html2pdf_app.clone(),
                self.viewport_width,
                self.viewport_height,
            );
            out.push(ProviderDescriptor::new(
                Arc::new(app),
                HTML2PDF_APP_PRIORITY,
                Duration::from_secs(self.html2pdf_app.timeout_secs),
            ));
        }

        if let Some(gw) = &self.gateway {
            let provider =
                gateway::GatewayProvider::new(gw.clone(), self.viewport_width, self.viewport_height);
            out.push(ProviderDescriptor::new(
                Arc::new(provider),
                GATEWAY_PRIORITY,
                Duration::from_secs(gw.timeout_secs),
            ));
        }

        out
    }
}

/// Shared client for the remote adapters; timeouts are set per request.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("html2pdf-fit/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Keep error bodies readable in logs and reports.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 512;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

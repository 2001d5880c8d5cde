//! The local headless browser as a provider.

use super::PdfProvider;
use crate::error::AttemptError;
use crate::output::RenderedPdf;
use crate::render::{BrowserEngine, RenderSession, RenderSettings};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const LOCAL_ID: &str = "local";

/// Runs a [`RenderSession`] on the blocking pool.
///
/// If the chain abandons the attempt on timeout, the blocking task keeps
/// going until the session's own content timeout fires; its page guard still
/// tears the browser down.
pub struct LocalEngineProvider {
    engine: Arc<dyn BrowserEngine>,
    settings: RenderSettings,
}

impl LocalEngineProvider {
    pub fn new(engine: Arc<dyn BrowserEngine>, settings: RenderSettings) -> Self {
        Self { engine, settings }
    }
}

#[async_trait]
impl PdfProvider for LocalEngineProvider {
    fn id(&self) -> &str {
        LOCAL_ID
    }

    async fn invoke(&self, html: &str, _timeout: Duration) -> Result<RenderedPdf, AttemptError> {
        let engine = Arc::clone(&self.engine);
        let settings = self.settings;
        let html = html.to_string();

        let sized = tokio::task::spawn_blocking(move || {
            RenderSession::new(engine.as_ref(), settings).render(&html)
        })
        .await
        .map_err(|e| AttemptError::Render(format!("render task failed: {e}")))??;

        debug!(
            "local render produced {} bytes at {}px",
            sized.bytes.len(),
            sized.content_height_px
        );
        Ok(RenderedPdf {
            bytes: sized.bytes,
            content_height_px: Some(sized.content_height_px),
        })
    }
}

//! Adapter for the hosted html2pdf.app API.
//!
//! Success is HTTP 200 with the raw PDF as the body. Anything else is a
//! failure; the response body is kept (truncated) for diagnostics.

use super::{http_client, truncate_body, PdfProvider};
use crate::config::RemoteProviderConfig;
use crate::error::AttemptError;
use crate::output::RenderedPdf;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

pub const HTML2PDF_APP_ID: &str = "html2pdf-app";

pub struct Html2PdfAppProvider {
    config: RemoteProviderConfig,
    width: u32,
    height: u32,
    client: reqwest::Client,
}

impl Html2PdfAppProvider {
    pub fn new(config: RemoteProviderConfig, width: u32, height: u32) -> Self {
        Self {
            config,
            width,
            height,
            client: http_client(),
        }
    }

    fn body<'a>(&'a self, html: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            html,
            api_key: self.config.api_key.as_deref(),
            engine: "chrome",
            options: GenerateOptions {
                viewport: ViewportSize {
                    width: self.width,
                    height: self.height,
                },
                width: format!("{}px", self.width),
                print_background: true,
                prefer_css_page_size: false,
                display_header_footer: false,
                margin: Margin {
                    top: "0",
                    right: "0",
                    bottom: "0",
                    left: "0",
                },
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
    engine: &'static str,
    options: GenerateOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateOptions {
    viewport: ViewportSize,
    width: String,
    print_background: bool,
    #[serde(rename = "preferCSSPageSize")]
    prefer_css_page_size: bool,
    display_header_footer: bool,
    margin: Margin,
}

#[derive(Serialize)]
struct ViewportSize {
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct Margin {
    top: &'static str,
    right: &'static str,
    bottom: &'static str,
    left: &'static str,
}

#[async_trait]
impl PdfProvider for Html2PdfAppProvider {
    fn id(&self) -> &str {
        HTML2PDF_APP_ID
    }

    async fn invoke(&self, html: &str, timeout: Duration) -> Result<RenderedPdf, AttemptError> {
        let started = Instant::now();
        let elapsed_ms = || started.elapsed().as_millis() as u64;

        let response = self
            .client
            .post(&self.config.endpoint)
            .timeout(timeout)
            .json(&self.body(html))
            .send()
            .await
            .map_err(|e| AttemptError::from_reqwest(e, elapsed_ms()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::ProviderHttp {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AttemptError::from_reqwest(e, elapsed_ms()))?;
        if bytes.is_empty() {
            return Err(AttemptError::ProviderTransport(
                "empty response body".into(),
            ));
        }
        debug!("html2pdf.app returned {} bytes in {}ms", bytes.len(), elapsed_ms());

        Ok(RenderedPdf {
            bytes: bytes.to_vec(),
            content_height_px: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let provider = Html2PdfAppProvider::new(
            RemoteProviderConfig {
                api_key: Some("k".into()),
                ..RemoteProviderConfig::default()
            },
            1024,
            800,
        );
        let v = serde_json::to_value(provider.body("<p>x</p>")).unwrap();
        assert_eq!(v["html"], "<p>x</p>");
        assert_eq!(v["apiKey"], "k");
        assert_eq!(v["engine"], "chrome");
        assert_eq!(v["options"]["viewport"]["width"], 1024);
        assert_eq!(v["options"]["viewport"]["height"], 800);
        assert_eq!(v["options"]["width"], "1024px");
        assert_eq!(v["options"]["printBackground"], true);
        assert_eq!(v["options"]["preferCSSPageSize"], false);
        assert_eq!(v["options"]["displayHeaderFooter"], false);
        assert_eq!(v["options"]["margin"]["left"], "0");
    }

    #[test]
    fn api_key_is_omitted_when_unset() {
        let provider = Html2PdfAppProvider::new(RemoteProviderConfig::default(), 1024, 800);
        let v = serde_json::to_value(provider.body("<p/>")).unwrap();
        assert!(v.get("apiKey").is_none());
    }
}

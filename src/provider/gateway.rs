//! Adapter for a generic JSON conversion gateway.
//!
//! The HTML travels base64-encoded and the PDF comes back the same way:
//!
//! ```text
//! POST <endpoint>  {"html_base64": "...", "width": 1024, "height": 800}
//! 200              {"success": true, "pdf": "<base64>"}
//! ```
//!
//! A 2xx response with `success: false` is still a failure. Another instance
//! of this service answers in the same shape when asked for `base64` output.

use super::{http_client, truncate_body, PdfProvider};
use crate::config::GatewayConfig;
use crate::error::AttemptError;
use crate::output::RenderedPdf;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

pub const GATEWAY_ID: &str = "gateway";

pub struct GatewayProvider {
    config: GatewayConfig,
    width: u32,
    height: u32,
    client: reqwest::Client,
}

impl GatewayProvider {
    pub fn new(config: GatewayConfig, width: u32, height: u32) -> Self {
        Self {
            config,
            width,
            height,
            client: http_client(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GatewayRequest {
    html_base64: String,
    width: u32,
    height: u32,
    /// Lets a peer instance of this service answer in its encoded shape.
    #[serde(rename = "returnType")]
    return_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    success: bool,
    pdf: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl PdfProvider for GatewayProvider {
    fn id(&self) -> &str {
        GATEWAY_ID
    }

    async fn invoke(&self, html: &str, timeout: Duration) -> Result<RenderedPdf, AttemptError> {
        let started = Instant::now();
        let elapsed_ms = || started.elapsed().as_millis() as u64;

        let request = GatewayRequest {
            html_base64: STANDARD.encode(html),
            width: self.width,
            height: self.height,
            return_type: "base64",
        };
        let response = self
            .client
            .post(&self.config.endpoint)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| AttemptError::from_reqwest(e, elapsed_ms()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AttemptError::from_reqwest(e, elapsed_ms()))?;
        if !status.is_success() {
            return Err(AttemptError::ProviderHttp {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let parsed: GatewayResponse = serde_json::from_str(&text).map_err(|e| {
            AttemptError::ProviderTransport(format!("unreadable gateway response: {e}"))
        })?;
        let bytes = decode_response(parsed, status.as_u16())?;
        debug!("gateway returned {} bytes in {}ms", bytes.len(), elapsed_ms());

        Ok(RenderedPdf {
            bytes,
            content_height_px: None,
        })
    }
}

fn decode_response(parsed: GatewayResponse, status: u16) -> Result<Vec<u8>, AttemptError> {
    let pdf = match parsed {
        GatewayResponse {
            success: true,
            pdf: Some(pdf),
            ..
        } => pdf,
        GatewayResponse { error, .. } => {
            return Err(AttemptError::ProviderHttp {
                status,
                body: error.unwrap_or_else(|| "gateway reported failure".into()),
            })
        }
    };
    let bytes = STANDARD
        .decode(pdf.trim())
        .map_err(|e| AttemptError::ProviderTransport(format!("invalid base64 PDF: {e}")))?;
    if bytes.is_empty() {
        return Err(AttemptError::ProviderTransport("gateway returned an empty PDF".into()));
    }
    Ok(bytes)
}

//! Result types: per-attempt outcomes, the final result and its two wire shapes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Media type of every PDF this crate produces.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Identifier used in the [`FailureReport`] that closes an exhausted chain.
pub const CHAIN_ID: &str = "fallback-chain";

/// PDF bytes as returned by a single provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    /// Measured document height in CSS pixels. Only the local engine knows it.
    pub content_height_px: Option<u32>,
}

/// Coarse failure classification shared by attempt reports and HTTP bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Launch,
    ContentTimeout,
    Render,
    ProviderTimeout,
    ProviderHttp,
    ProviderTransport,
    AllProvidersExhausted,
}

/// Diagnostic record for one failed attempt, or for the exhausted chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    #[serde(rename = "provider")]
    pub provider_id: String,
    pub kind: FailureKind,
    pub detail: String,
    /// Per-provider reports; only populated for [`FailureKind::AllProvidersExhausted`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<FailureReport>,
}

impl FailureReport {
    pub fn new(provider_id: impl Into<String>, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            kind,
            detail: detail.into(),
            causes: Vec::new(),
        }
    }

    /// The terminal report of a chain in which every provider failed.
    pub fn exhausted(causes: Vec<FailureReport>) -> Self {
        Self {
            provider_id: CHAIN_ID.to_string(),
            kind: FailureKind::AllProvidersExhausted,
            detail: format!("all {} providers failed", causes.len()),
            causes,
        }
    }
}

/// Outcome of one attempt, or of a whole chain run. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Success {
        pdf: Vec<u8>,
        content_height_px: Option<u32>,
        provider_id: String,
    },
    Failure(FailureReport),
}

impl RenderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RenderOutcome::Success { .. })
    }

    pub fn provider_id(&self) -> &str {
        match self {
            RenderOutcome::Success { provider_id, .. } => provider_id,
            RenderOutcome::Failure(report) => &report.provider_id,
        }
    }
}

/// Final envelope of a successful conversion, owned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub bytes: Vec<u8>,
    pub byte_length: usize,
    pub provider_id: String,
    pub content_height_px: Option<u32>,
    /// Normalized filename (always ends in `.pdf`).
    pub filename: String,
}

impl ConversionResult {
    /// Shape the result for transmission.
    pub fn into_output(self, return_type: crate::request::ReturnType) -> ConversionOutput {
        match return_type {
            crate::request::ReturnType::File => ConversionOutput::File(PdfFile {
                bytes: self.bytes,
                filename: self.filename,
                provider_id: self.provider_id,
                content_height_px: self.content_height_px,
            }),
            crate::request::ReturnType::Encoded => ConversionOutput::Encoded(EncodedPdf {
                success: true,
                pdf: STANDARD.encode(&self.bytes),
                size: self.byte_length,
                filename: self.filename,
                provider_id: self.provider_id,
            }),
        }
    }
}

/// What [`crate::Converter::convert`] hands back to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutput {
    /// Raw bytes for binary transmission as an attachment.
    File(PdfFile),
    /// Base64 text inside a JSON payload.
    Encoded(EncodedPdf),
}

impl ConversionOutput {
    pub fn provider_id(&self) -> &str {
        match self {
            ConversionOutput::File(f) => &f.provider_id,
            ConversionOutput::Encoded(e) => &e.provider_id,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            ConversionOutput::File(f) => &f.filename,
            ConversionOutput::Encoded(e) => &e.filename,
        }
    }

    /// The PDF bytes regardless of shape.
    pub fn to_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self {
            ConversionOutput::File(f) => Ok(f.bytes.clone()),
            ConversionOutput::Encoded(e) => e.decode(),
        }
    }
}

/// Binary output: bytes plus attachment metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub provider_id: String,
    pub content_height_px: Option<u32>,
}

impl PdfFile {
    pub fn media_type(&self) -> &'static str {
        PDF_MEDIA_TYPE
    }

    /// `Content-Disposition` value with the filename made header-safe.
    pub fn content_disposition(&self) -> String {
        let safe: String = self
            .filename
            .chars()
            .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
            .collect();
        format!("attachment; filename=\"{safe}\"")
    }
}

/// Encoded output. Serialises to exactly `{success, pdf, size}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPdf {
    pub success: bool,
    pub pdf: String,
    pub size: usize,
    #[serde(skip)]
    pub filename: String,
    #[serde(skip)]
    pub provider_id: String,
}

impl EncodedPdf {
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.pdf)
    }
}

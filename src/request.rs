//! The conversion request and its wire form.

use crate::error::ConvertError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Filename used when the caller supplies none.
pub const DEFAULT_FILENAME: &str = "document.pdf";

/// How the PDF is handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnType {
    /// Raw bytes, sent as an `application/pdf` attachment. (default)
    #[default]
    #[serde(rename = "file")]
    File,
    /// Base64 text inside a JSON payload.
    #[serde(rename = "base64", alias = "encoded")]
    Encoded,
}

/// A single HTML-to-PDF conversion request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    html: String,
    filename: String,
    return_type: ReturnType,
}

impl ConversionRequest {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            filename: DEFAULT_FILENAME.to_string(),
            return_type: ReturnType::File,
        }
    }

    /// Set the output filename; `.pdf` is appended when missing.
    pub fn with_filename(mut self, filename: impl AsRef<str>) -> Self {
        self.filename = normalize_filename(filename.as_ref());
        self
    }

    pub fn with_return_type(mut self, return_type: ReturnType) -> Self {
        self.return_type = return_type;
        self
    }

    /// Parse a JSON request body.
    ///
    /// A missing `html` field is not a parse error: the request is built with
    /// empty HTML and rejected by [`ConversionRequest::validate`], which is
    /// what the orchestrator runs before touching any provider.
    ///
    /// `html_base64` is accepted in place of `html`, which is how the gateway
    /// adapter of a peer instance sends its markup.
    pub fn from_json(body: &[u8]) -> Result<Self, ConvertError> {
        let wire: WireRequest = serde_json::from_slice(body)
            .map_err(|e| ConvertError::InvalidRequest(e.to_string()))?;
        let html = match (wire.html, wire.html_base64) {
            (Some(html), _) => html,
            (None, Some(encoded)) => {
                let raw = STANDARD.decode(encoded.trim()).map_err(|e| {
                    ConvertError::InvalidRequest(format!("html_base64 is not valid base64: {e}"))
                })?;
                String::from_utf8(raw).map_err(|_| {
                    ConvertError::InvalidRequest("html_base64 is not valid UTF-8".into())
                })?
            }
            (None, None) => String::new(),
        };
        let mut req = ConversionRequest::new(html)
            .with_return_type(wire.return_type.unwrap_or_default());
        if let Some(name) = wire.filename {
            req = req.with_filename(name);
        }
        Ok(req)
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    /// Cheap check run before any provider is invoked.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.html.trim().is_empty() {
            return Err(ConvertError::Validation);
        }
        Ok(())
    }
}

/// JSON body accepted by the HTTP layer.
#[derive(Debug, Default, Deserialize)]
struct WireRequest {
    html: Option<String>,
    html_base64: Option<String>,
    filename: Option<String>,
    #[serde(rename = "returnType", alias = "return_type")]
    return_type: Option<ReturnType>,
}

/// Append `.pdf` unless the name already ends with it.
///
/// Blank names fall back to [`DEFAULT_FILENAME`]. The check is a literal,
/// case-sensitive suffix match, so `REPORT.PDF` becomes `REPORT.PDF.pdf`.
pub fn normalize_filename(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }
    if name.ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

//! HTTP surface.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /api/html-to-pdf` | convert `{html, filename?, returnType?}` |
//! | `GET /api/health` | liveness plus the configured provider order |
//! | `GET /` | service metadata |

use crate::convert::Converter;
use crate::error::ConvertError;
use crate::output::{ConversionOutput, FailureReport, PdfFile};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use tracing::{error, info, warn};

/// Response header naming the provider that produced the PDF.
pub const PROVIDER_HEADER: HeaderName = HeaderName::from_static("x-pdf-provider");

/// Build the router around a shared converter.
pub fn router(converter: Converter) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/html-to-pdf", post(html_to_pdf))
        .with_state(converter)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, converter: Converter) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "Listening on http://{} (providers: {})",
        listener.local_addr()?,
        converter.chain().provider_ids().join(" → ")
    );
    axum::serve(listener, router(converter).into_make_service()).await
}

async fn html_to_pdf(
    State(converter): State<Converter>,
    body: Bytes,
) -> Result<Response, HttpError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ConvertError::Validation.into());
    }
    let request = crate::request::ConversionRequest::from_json(&body)?;
    match converter.convert(&request).await? {
        ConversionOutput::File(file) => file_response(file),
        ConversionOutput::Encoded(encoded) => {
            let provider = header_value(&encoded.provider_id)?;
            let mut response = Json(&encoded).into_response();
            response.headers_mut().insert(PROVIDER_HEADER, provider);
            Ok(response)
        }
    }
}

fn file_response(file: PdfFile) -> Result<Response, HttpError> {
    let disposition = header_value(&file.content_disposition())?;
    let provider = header_value(&file.provider_id)?;
    let mut response = file.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(crate::output::PDF_MEDIA_TYPE));
    headers.insert(CONTENT_DISPOSITION, disposition);
    headers.insert(PROVIDER_HEADER, provider);
    Ok(response)
}

/// Accepts non-ASCII (UTF-8 filenames pass through as opaque bytes).
fn header_value(s: &str) -> Result<HeaderValue, HttpError> {
    HeaderValue::from_bytes(s.as_bytes())
        .map_err(|e| HttpError::internal(format!("invalid header value {s:?}: {e}")))
}

async fn health(State(converter): State<Converter>) -> Json<serde_json::Value> {
    let (w, h) = converter.viewport();
    Json(json!({
        "status": "ok",
        "viewport": format!("{w}x{h}"),
        "providers": converter.chain().provider_ids(),
    }))
}

async fn index(State(converter): State<Converter>) -> Json<serde_json::Value> {
    let (w, h) = converter.viewport();
    Json(json!({
        "name": "HTML to PDF API",
        "version": env!("CARGO_PKG_VERSION"),
        "viewport": format!("{w}x{h}"),
        "usage": "POST /api/html-to-pdf with {\"html\": \"...\", \"filename\": \"...\", \"returnType\": \"file|base64\"}",
        "endpoints": ["/api/html-to-pdf", "/api/health"],
    }))
}

/// A JSON error response.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    body: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<Vec<FailureReport>>,
}

impl HttpError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                attempts: None,
            },
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ConvertError> for HttpError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::Validation | ConvertError::InvalidRequest(_) => {
                HttpError::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            ConvertError::AllProvidersExhausted { failures } => {
                warn!("Returning 503: {} providers failed", failures.len());
                HttpError {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: ErrorBody {
                        error: "PDF generation failed".into(),
                        attempts: Some(failures),
                    },
                }
            }
            other => {
                error!("Returning 500: {other}");
                HttpError::internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FailureKind;

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            HttpError::from(ConvertError::Validation).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::from(ConvertError::InvalidRequest("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::from(ConvertError::AllProvidersExhausted { failures: vec![] }).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            HttpError::from(ConvertError::Internal("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn exhausted_body_lists_attempts() {
        let err = HttpError::from(ConvertError::AllProvidersExhausted {
            failures: vec![FailureReport::new("local", FailureKind::Launch, "no chrome")],
        });
        let v = serde_json::to_value(&err.body).unwrap();
        assert_eq!(v["error"], "PDF generation failed");
        assert_eq!(v["attempts"][0]["provider"], "local");
        assert_eq!(v["attempts"][0]["kind"], "launch");
    }

    #[test]
    fn header_values_allow_utf8_filenames() {
        assert!(header_value("attachment; filename=\"résumé.pdf\"").is_ok());
        assert!(header_value("bad\nvalue").is_err());
    }
}

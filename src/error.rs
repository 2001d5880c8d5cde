//! Error types for the html2pdf-fit library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`]: **Fatal**: the conversion cannot produce a PDF at all
//!   (no HTML supplied, every provider failed, bad configuration). Returned as
//!   `Err(ConvertError)` from [`crate::Converter::convert`].
//!
//! * [`AttemptError`]: **Non-fatal**: one provider failed (browser would not
//!   launch, remote backend answered 502) but the fallback chain simply moves
//!   on to the next provider. Attempt errors never escape the chain; they are
//!   flattened into [`crate::output::FailureReport`]s for diagnostics.

use crate::output::{FailureKind, FailureReport};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the html2pdf-fit library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request carried no HTML (absent, empty or whitespace only).
    #[error("Missing \"html\" field")]
    Validation,

    /// The request body could not be interpreted at all.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Could not read HTML from a local file.
    #[error("HTML file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    // ── Chain errors ──────────────────────────────────────────────────────
    /// Every configured provider failed; one report per provider.
    #[error("All {} providers failed.\n{}", .failures.len(), summarize(.failures))]
    AllProvidersExhausted { failures: Vec<FailureReport> },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or chain validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn summarize(failures: &[FailureReport]) -> String {
    failures
        .iter()
        .map(|f| format!("  • {}: {}", f.provider_id, f.detail))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A non-fatal failure of a single provider attempt.
///
/// The first three variants come from the local rendering engine, the
/// remaining three from remote adapters. [`AttemptError::kind`] gives the
/// coarse classification used in reports and HTTP bodies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    /// The browser process could not be located or started.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// The page never reached network quiescence within the bounded wait.
    #[error("page did not become idle within {waited_ms}ms")]
    ContentTimeout { waited_ms: u64 },

    /// Any other engine-reported failure (CDP error, bad measurement, …).
    #[error("render failed: {0}")]
    Render(String),

    /// The backend did not answer within the attempt budget.
    #[error("no response within {elapsed_ms}ms")]
    ProviderTimeout { elapsed_ms: u64 },

    /// The backend answered with a non-success status or success flag.
    #[error("HTTP {status}: {body}")]
    ProviderHttp { status: u16, body: String },

    /// Connection-level failure (DNS, TLS, reset, undecodable body).
    #[error("transport error: {0}")]
    ProviderTransport(String),
}

impl AttemptError {
    /// Coarse classification of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            AttemptError::Launch(_) => FailureKind::Launch,
            AttemptError::ContentTimeout { .. } => FailureKind::ContentTimeout,
            AttemptError::Render(_) => FailureKind::Render,
            AttemptError::ProviderTimeout { .. } => FailureKind::ProviderTimeout,
            AttemptError::ProviderHttp { .. } => FailureKind::ProviderHttp,
            AttemptError::ProviderTransport(_) => FailureKind::ProviderTransport,
        }
    }

    /// Map a `reqwest` error to the matching attempt failure.
    pub(crate) fn from_reqwest(err: reqwest::Error, elapsed_ms: u64) -> Self {
        if err.is_timeout() {
            AttemptError::ProviderTimeout { elapsed_ms }
        } else if let Some(status) = err.status() {
            AttemptError::ProviderHttp {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            AttemptError::ProviderTransport(err.to_string())
        }
    }
}

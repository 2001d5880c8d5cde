//! # html2pdf-fit
//!
//! Convert HTML to a PDF whose single page is exactly as wide as the viewport
//! and exactly as tall as the rendered content.
//!
//! ## Why this crate?
//!
//! Printing a web page to A4 or Letter cuts it wherever the paper ends.
//! Dashboards, receipts and reports read better as one continuous page, so
//! this crate renders the HTML in headless Chrome, measures the document's
//! scroll height once the network has gone quiet, and prints a single page
//! of that size. When no local browser is usable, remote conversion
//! services are tried in order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ConversionRequest
//!  │
//!  ├─ 1. Validate  reject missing / blank HTML before any provider runs
//!  ├─ 2. Chain     local Chrome → html2pdf.app → JSON gateway, each time-boxed
//!  │               └─ local: launch → set content → wait idle → measure → print
//!  └─ 3. Shape     raw bytes (attachment) or {success, pdf, size} base64 JSON
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use html2pdf_fit::{ConversionConfig, ConversionOutput, ConversionRequest, Converter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::from_config(&ConversionConfig::default())?;
//!     let request = ConversionRequest::new("<h1>Invoice #42</h1>").with_filename("invoice");
//!     if let ConversionOutput::File(pdf) = converter.convert(&request).await? {
//!         std::fs::write(&pdf.filename, &pdf.bytes)?;
//!         eprintln!("{} bytes via {}", pdf.bytes.len(), pdf.provider_id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Enables [`server`] (axum router for `POST /api/html-to-pdf`) |
//! | `cli`    | on      | Enables the `html2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable both when using only the library:
//! ```toml
//! html2pdf-fit = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chain;
pub mod config;
pub mod convert;
pub mod error;
pub mod input;
pub mod output;
pub mod progress;
pub mod provider;
pub mod render;
pub mod request;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chain::FallbackChain;
pub use config::{ConversionConfig, ConversionConfigBuilder, GatewayConfig, RemoteProviderConfig};
pub use convert::Converter;
pub use error::{AttemptError, ConvertError};
pub use output::{
    ConversionOutput, ConversionResult, EncodedPdf, FailureKind, FailureReport, PdfFile,
    RenderOutcome, RenderedPdf,
};
pub use progress::{FallbackProgressCallback, NoopProgressCallback, ProgressCallback};
pub use provider::{PdfProvider, ProviderDescriptor};
pub use request::{ConversionRequest, ReturnType};

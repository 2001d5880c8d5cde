//! Conversion entry points.
//!
//! [`Converter`] is the orchestrator: it validates the request, runs the
//! fallback chain and shapes the winning provider's bytes into the requested
//! [`ConversionOutput`]. It is cheap to clone and safe to share between
//! concurrent requests; nothing in it is mutated after construction.

use crate::chain::FallbackChain;
use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::{ConversionOutput, ConversionResult, RenderOutcome};
use crate::provider::ProviderDescriptor;
use crate::request::ConversionRequest;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Converter {
    chain: FallbackChain,
    viewport: (u32, u32),
}

impl Converter {
    /// Wrap an existing chain. The viewport is only reported, not enforced.
    pub fn new(chain: FallbackChain) -> Self {
        let d = ConversionConfig::default();
        Self {
            chain,
            viewport: (d.viewport_width, d.viewport_height),
        }
    }

    /// Build the provider list described by `config`.
    ///
    /// # Example
    /// ```rust,no_run
    /// use html2pdf_fit::{ConversionConfig, ConversionRequest, Converter};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let converter = Converter::from_config(&ConversionConfig::from_env()?)?;
    /// let output = converter
    ///     .convert(&ConversionRequest::new("<h1>Hello</h1>").with_filename("hello"))
    ///     .await?;
    /// println!("{} via {}", output.filename(), output.provider_id());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_config(config: &ConversionConfig) -> Result<Self, ConvertError> {
        Self::from_providers(config, config.providers())
    }

    /// Use `config` for viewport and progress reporting but a caller-supplied
    /// provider list.
    pub fn from_providers(
        config: &ConversionConfig,
        providers: Vec<ProviderDescriptor>,
    ) -> Result<Self, ConvertError> {
        let chain = FallbackChain::new(providers)?.with_progress(config.progress_callback.clone());
        Ok(Self {
            chain,
            viewport: (config.viewport_width, config.viewport_height),
        })
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    /// `(width, height)` in CSS pixels.
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Run the chain and return the raw result envelope.
    ///
    /// # Errors
    /// * [`ConvertError::Validation`] when the HTML is missing or blank.
    ///   No provider is invoked in that case.
    /// * [`ConvertError::AllProvidersExhausted`] when every provider failed.
    pub async fn convert_result(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResult, ConvertError> {
        request.validate()?;

        let started = Instant::now();
        info!(
            "Converting {} bytes of HTML to '{}'",
            request.html().len(),
            request.filename()
        );

        match self.chain.run(request.html()).await {
            RenderOutcome::Success {
                pdf,
                content_height_px,
                provider_id,
            } => {
                info!(
                    "Conversion complete via '{}': {} bytes in {}ms",
                    provider_id,
                    pdf.len(),
                    started.elapsed().as_millis()
                );
                Ok(ConversionResult {
                    byte_length: pdf.len(),
                    bytes: pdf,
                    provider_id,
                    content_height_px,
                    filename: request.filename().to_string(),
                })
            }
            RenderOutcome::Failure(report) => Err(ConvertError::AllProvidersExhausted {
                failures: report.causes,
            }),
        }
    }

    /// Convert and shape the result according to the request's return type.
    pub async fn convert(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionOutput, ConvertError> {
        let result = self.convert_result(request).await?;
        Ok(result.into_output(request.return_type()))
    }

    /// Convert and write the PDF into `dir` under the request's filename.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn convert_to_file(
        &self,
        request: &ConversionRequest,
        dir: impl AsRef<Path>,
    ) -> Result<(PathBuf, ConversionResult), ConvertError> {
        let path = output_path(dir.as_ref(), request.filename())?;
        let result = self.convert_result(request).await?;
        write_atomic(&path, &result.bytes).await?;
        debug!("Wrote {}", path.display());
        Ok((path, result))
    }

    /// Synchronous wrapper around [`Converter::convert`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from within
    /// an async context.
    pub fn convert_sync(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionOutput, ConvertError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.convert(request))
    }
}

/// `dir/filename`, provided `filename` is a single plain path component.
///
/// Separators, `..` and absolute names are rejected so the file always lands
/// directly inside `dir`.
fn output_path(dir: &Path, filename: &str) -> Result<PathBuf, ConvertError> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(leaf)), None) => Ok(dir.join(leaf)),
        _ => Err(ConvertError::InvalidRequest(format!(
            "filename '{filename}' must not contain a path"
        ))),
    }
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let fail = |source| ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(fail)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(fail(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_stays_inside_dir() {
        let dir = Path::new("/srv/out");
        assert_eq!(
            output_path(dir, "report.pdf").unwrap(),
            PathBuf::from("/srv/out/report.pdf")
        );
        assert_eq!(
            output_path(dir, "...pdf").unwrap(),
            PathBuf::from("/srv/out/...pdf")
        );
        for name in ["../escaped.pdf", "/tmp/abs.pdf", "sub/dir.pdf", "..", ""] {
            assert!(
                matches!(output_path(dir, name), Err(ConvertError::InvalidRequest(_))),
                "{name:?}"
            );
        }
    }

    #[tokio::test]
    async fn write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.pdf");
        write_atomic(&path, b"%PDF-1.7").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
        assert!(!dir.path().join("nested/out.pdf.tmp").exists());
    }

    #[tokio::test]
    async fn write_atomic_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A file where a directory is expected.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let err = write_atomic(&blocker.join("out.pdf"), b"%PDF")
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::OutputWriteFailed { .. }));
        assert!(err.to_string().contains("out.pdf"));
    }
}

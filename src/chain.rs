//! The ordered fallback chain.
//!
//! ```text
//! Pending ──▶ Trying(0) ──▶ Trying(1) ──▶ … ──▶ Exhausted
//!                │              │
//!                └──────────────┴──────────▶ Succeeded(i)
//! ```
//!
//! Attempts run strictly one after another. Each is bounded by its
//! descriptor's timeout; a timed-out attempt is abandoned (its future is
//! dropped) and recorded like any other failure.

use crate::error::{AttemptError, ConvertError};
use crate::output::{FailureReport, RenderOutcome, RenderedPdf};
use crate::progress::ProgressCallback;
use crate::provider::ProviderDescriptor;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a chain run currently is. Terminal states are never left.
#[derive(Debug)]
enum ChainState {
    Pending,
    Trying(usize),
    Succeeded(usize, RenderedPdf),
    Exhausted,
}

/// Immutable, cheaply clonable list of providers sorted by priority.
#[derive(Clone)]
pub struct FallbackChain {
    providers: Arc<[ProviderDescriptor]>,
    progress: Option<ProgressCallback>,
}

impl FallbackChain {
    /// Build a chain. Providers are stable-sorted by ascending priority, so
    /// ties keep the order they were given in.
    ///
    /// # Errors
    /// [`ConvertError::InvalidConfig`] for an empty list or a repeated id.
    pub fn new(mut providers: Vec<ProviderDescriptor>) -> Result<Self, ConvertError> {
        if providers.is_empty() {
            return Err(ConvertError::InvalidConfig(
                "Fallback chain needs at least one provider".into(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = providers.iter().find(|d| !seen.insert(d.id.clone())) {
            return Err(ConvertError::InvalidConfig(format!(
                "Duplicate provider id '{}'",
                dup.id
            )));
        }
        providers.sort_by_key(|d| d.priority);
        Ok(Self {
            providers: providers.into(),
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Provider ids in the order they will be tried.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Try each provider until one produces a PDF.
    ///
    /// Returns `Success` from the first provider that succeeds; providers
    /// after it are not invoked. If every provider fails the result is a
    /// `Failure` of kind `AllProvidersExhausted` holding one report per
    /// provider, in chain order.
    pub async fn run(&self, html: &str) -> RenderOutcome {
        let total = self.providers.len();
        let mut failures: Vec<FailureReport> = Vec::with_capacity(total);
        let mut state = ChainState::Pending;

        if let Some(cb) = &self.progress {
            cb.on_conversion_start(total);
        }

        loop {
            state = match state {
                ChainState::Pending if total == 0 => ChainState::Exhausted,
                ChainState::Pending => ChainState::Trying(0),
                ChainState::Trying(i) => match self.attempt(i, html).await {
                    Ok(pdf) => ChainState::Succeeded(i, pdf),
                    Err(report) => {
                        failures.push(report);
                        if i + 1 < total {
                            ChainState::Trying(i + 1)
                        } else {
                            ChainState::Exhausted
                        }
                    }
                },
                ChainState::Succeeded(i, pdf) => {
                    let id = self.providers[i].id.clone();
                    info!("PDF generated by '{}' ({} bytes)", id, pdf.bytes.len());
                    if let Some(cb) = &self.progress {
                        cb.on_conversion_complete(&id, pdf.bytes.len());
                    }
                    return RenderOutcome::Success {
                        pdf: pdf.bytes,
                        content_height_px: pdf.content_height_px,
                        provider_id: id,
                    };
                }
                ChainState::Exhausted => {
                    warn!("All {} providers failed", failures.len());
                    if let Some(cb) = &self.progress {
                        cb.on_chain_exhausted(&failures);
                    }
                    return RenderOutcome::Failure(FailureReport::exhausted(failures));
                }
            };
        }
    }

    /// One bounded attempt against provider `index`.
    async fn attempt(&self, index: usize, html: &str) -> Result<RenderedPdf, FailureReport> {
        let d = &self.providers[index];
        let total = self.providers.len();
        if let Some(cb) = &self.progress {
            cb.on_attempt_start(&d.id, index, total);
        }
        debug!(
            "Trying provider '{}' ({}/{}, budget {:?})",
            d.id,
            index + 1,
            total,
            d.timeout
        );

        let started = Instant::now();
        let result = match tokio::time::timeout(d.timeout, d.provider.invoke(html, d.timeout)).await
        {
            Ok(Ok(pdf)) if pdf.bytes.is_empty() => Err(AttemptError::ProviderTransport(
                "provider returned an empty PDF".into(),
            )),
            Ok(result) => result,
            Err(_) => Err(AttemptError::ProviderTimeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
        };

        result.map_err(|e| {
            warn!(
                "Provider '{}' failed after {}ms ({:?}): {}",
                d.id,
                started.elapsed().as_millis(),
                e.kind(),
                e
            );
            let report = FailureReport::new(d.id.clone(), e.kind(), e.to_string());
            if let Some(cb) = &self.progress {
                cb.on_attempt_failed(&report, index, total);
            }
            report
        })
    }
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackChain")
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

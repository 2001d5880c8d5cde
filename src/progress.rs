//! Progress-callback trait for fallback-chain events.
//!
//! Inject an [`Arc<dyn FallbackProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to observe
//! each provider attempt as the chain walks through them.
//!
//! # Example
//!
//! ```rust
//! use html2pdf_fit::{ConversionConfig, FailureReport, FallbackProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter {
//!     failed: AtomicUsize,
//! }
//!
//! impl FallbackProgressCallback for FailureCounter {
//!     fn on_attempt_failed(&self, failure: &FailureReport, _index: usize, _total: usize) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} failed: {}", failure.provider_id, failure.detail);
//!     }
//! }
//!
//! let counter = Arc::new(FailureCounter { failed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn FallbackProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::FailureReport;
use std::sync::Arc;

/// Called by the fallback chain as it works through its providers.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events for one conversion arrive strictly in order;
/// concurrent conversions sharing one callback may interleave, hence the
/// `Send + Sync` bound.
pub trait FallbackProgressCallback: Send + Sync {
    /// Called once before the first attempt.
    ///
    /// # Arguments
    /// * `provider_count`: number of providers in the chain
    fn on_conversion_start(&self, provider_count: usize) {
        let _ = provider_count;
    }

    /// Called just before a provider is invoked.
    ///
    /// # Arguments
    /// * `provider_id`: id of the provider about to run
    /// * `index`: 0-based position in the chain
    /// * `total`: number of providers in the chain
    fn on_attempt_start(&self, provider_id: &str, index: usize, total: usize) {
        let _ = (provider_id, index, total);
    }

    /// Called when an attempt fails; the chain advances right after.
    fn on_attempt_failed(&self, failure: &FailureReport, index: usize, total: usize) {
        let _ = (failure, index, total);
    }

    /// Called once when a provider produced the PDF.
    ///
    /// # Arguments
    /// * `provider_id`: the winning provider
    /// * `byte_len`: size of the PDF
    fn on_conversion_complete(&self, provider_id: &str, byte_len: usize) {
        let _ = (provider_id, byte_len);
    }

    /// Called once when every provider failed.
    fn on_chain_exhausted(&self, failures: &[FailureReport]) {
        let _ = failures;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl FallbackProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn FallbackProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FailureKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        failures: AtomicUsize,
        completed_bytes: AtomicUsize,
    }

    impl FallbackProgressCallback for TrackingCallback {
        fn on_attempt_start(&self, _provider_id: &str, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_attempt_failed(&self, _failure: &FailureReport, _index: usize, _total: usize) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _provider_id: &str, byte_len: usize) {
            self.completed_bytes.store(byte_len, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(3);
        cb.on_attempt_start("local", 0, 3);
        cb.on_attempt_failed(&FailureReport::new("local", FailureKind::Launch, "x"), 0, 3);
        cb.on_conversion_complete("html2pdf-app", 42);
        cb.on_chain_exhausted(&[]);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_attempt_start("local", 0, 2);
        tracker.on_attempt_failed(&FailureReport::new("local", FailureKind::Render, "boom"), 0, 2);
        tracker.on_attempt_start("html2pdf-app", 1, 2);
        tracker.on_conversion_complete("html2pdf-app", 512);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_bytes.load(Ordering::SeqCst), 512);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(1);
        cb.on_attempt_start("local", 0, 1);
    }
}

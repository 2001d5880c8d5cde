//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use html2pdf_fit::{AttemptError, PdfProvider, ProviderDescriptor, RenderedPdf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a [`FakeProvider`] does when invoked.
#[derive(Clone)]
pub enum Behaviour {
    Succeed(Vec<u8>, Option<u32>),
    Fail(AttemptError),
    /// Never answers; only the chain's timeout ends the attempt.
    Hang,
}

/// In-memory provider that counts its invocations.
pub struct FakeProvider {
    id: String,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(id: &str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn succeeding(id: &str) -> Arc<Self> {
        Self::new(id, Behaviour::Succeed(pdf_bytes(id), None))
    }

    pub fn failing(id: &str, err: AttemptError) -> Arc<Self> {
        Self::new(id, Behaviour::Fail(err))
    }

    pub fn hanging(id: &str) -> Arc<Self> {
        Self::new(id, Behaviour::Hang)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn descriptor(self: &Arc<Self>, priority: i32, timeout: Duration) -> ProviderDescriptor {
        ProviderDescriptor::new(self.clone(), priority, timeout)
    }
}

#[async_trait]
impl PdfProvider for FakeProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn invoke(&self, _html: &str, _timeout: Duration) -> Result<RenderedPdf, AttemptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Succeed(bytes, height) => Ok(RenderedPdf {
                bytes: bytes.clone(),
                content_height_px: *height,
            }),
            Behaviour::Fail(err) => Err(err.clone()),
            Behaviour::Hang => std::future::pending().await,
        }
    }
}

/// Distinct, PDF-looking bytes per provider so tests can tell them apart.
pub fn pdf_bytes(tag: &str) -> Vec<u8> {
    format!("%PDF-1.7\n% produced by {tag}\n%%EOF\n").into_bytes()
}

pub fn launch_error() -> AttemptError {
    AttemptError::Launch("chrome not found".into())
}

pub fn http_error(status: u16) -> AttemptError {
    AttemptError::ProviderHttp {
        status,
        body: "upstream unavailable".into(),
    }
}

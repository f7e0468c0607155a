//! Scriptable in-process mock providers for the orchestrator's own test
//! suite, so pipeline behaviour can be asserted deterministically without
//! ever hitting a network-calling integration test.

use async_lock::Mutex;
use memora_core::embedding::{Embedding, Purpose};
use memora_core::llm::LlmRequest;
use memora_core::{EmbeddingModel, LanguageModel, ProviderError};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A [`LanguageModel`] that returns a scripted sequence of raw replies, one
/// per call, repeating the last reply once the script is exhausted.
#[derive(Debug)]
pub struct ScriptedLlm {
    replies: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    /// Creates a model that returns each of `replies` in order.
    #[must_use]
    pub fn new(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates a model that always returns `reply`.
    #[must_use]
    pub fn always(reply: impl Into<String>) -> Self {
        Self::new([reply.into()])
    }

    /// Returns how many times [`LanguageModel::complete`] has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LanguageModel for ScriptedLlm {
    async fn complete(&self, _request: LlmRequest) -> Result<String, ProviderError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .get(index)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or_default();
        Ok(reply)
    }
}

/// A [`LanguageModel`] whose `complete` always fails, for testing the
/// "never invoked" assertion in `infer=false` mode and reconciliation
/// abort paths.
#[derive(Debug, Default)]
pub struct NeverCalledLlm;

impl LanguageModel for NeverCalledLlm {
    async fn complete(&self, _request: LlmRequest) -> Result<String, ProviderError> {
        Err(ProviderError::permanent(anyhow::anyhow!(
            "this model must not be called"
        )))
    }
}

/// A [`LanguageModel`] that fails transiently a fixed number of times
/// before succeeding, for exercising the retry policy.
#[derive(Debug)]
pub struct FlakyLlm {
    fail_times: usize,
    calls: AtomicUsize,
    success_reply: String,
}

impl FlakyLlm {
    /// Creates a model that fails transiently `fail_times` times, then
    /// always returns `success_reply`.
    #[must_use]
    pub fn new(fail_times: usize, success_reply: impl Into<String>) -> Self {
        Self {
            fail_times,
            calls: AtomicUsize::new(0),
            success_reply: success_reply.into(),
        }
    }
}

impl LanguageModel for FlakyLlm {
    async fn complete(&self, _request: LlmRequest) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_times {
            Err(ProviderError::transient(anyhow::anyhow!("unavailable")))
        } else {
            Ok(self.success_reply.clone())
        }
    }
}

/// A deterministic [`EmbeddingModel`] that hashes text into a fixed-size
/// vector. Identical text always yields identical embeddings; the hash is
/// not cryptographic, only stable.
#[derive(Debug)]
pub struct DeterministicEmbedder {
    dimension: usize,
}

impl DeterministicEmbedder {
    /// Creates an embedder producing vectors of length `dimension`.
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingModel for DeterministicEmbedder {
    fn dim(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str, _purpose: Purpose) -> Result<Embedding, ProviderError> {
        let mut seed: u64 = 1469598103934665603;
        for byte in text.bytes() {
            seed ^= u64::from(byte);
            seed = seed.wrapping_mul(1099511628211);
        }
        Ok((0..self.dimension)
            .map(|i| {
                let mixed = seed.wrapping_add(i as u64).wrapping_mul(2654435761);
                ((mixed % 2000) as f32 / 1000.0) - 1.0
            })
            .collect())
    }
}

/// An [`EmbeddingModel`] wrapper counting how many calls it has received,
/// used to assert "no embedding calls happened" style expectations.
#[derive(Debug)]
pub struct CountingEmbedder<E> {
    inner: E,
    calls: AtomicUsize,
}

impl<E> CountingEmbedder<E> {
    /// Wraps `inner`, starting the call count at zero.
    #[must_use]
    pub const fn new(inner: E) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns how many times `embed` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<E: EmbeddingModel> EmbeddingModel for CountingEmbedder<E> {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    async fn embed(&self, text: &str, purpose: Purpose) -> Result<Embedding, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text, purpose).await
    }
}

/// A [`LanguageModel`] wrapper that records every request it received, for
/// assertions about prompt contents.
#[derive(Debug, Default)]
pub struct RecordingLlm<M> {
    inner: M,
    requests: Mutex<Vec<LlmRequest>>,
}

impl<M> RecordingLlm<M> {
    /// Wraps `inner`, starting with no recorded requests.
    #[must_use]
    pub const fn new(inner: M) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns a clone of every request observed so far.
    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().await.clone()
    }
}

impl<M: LanguageModel> LanguageModel for RecordingLlm<M> {
    async fn complete(&self, request: LlmRequest) -> Result<String, ProviderError> {
        self.requests.lock().await.push(request.clone());
        self.inner.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_llm_cycles_through_replies() {
        let llm = ScriptedLlm::new(["a", "b"]);
        assert_eq!(
            llm.complete(LlmRequest::new(vec![])).await.unwrap(),
            "a"
        );
        assert_eq!(
            llm.complete(LlmRequest::new(vec![])).await.unwrap(),
            "b"
        );
        assert_eq!(
            llm.complete(LlmRequest::new(vec![])).await.unwrap(),
            "b"
        );
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn deterministic_embedder_is_stable() {
        let embedder = DeterministicEmbedder::new(8);
        let a = embedder.embed("hello", Purpose::Add).await.unwrap();
        let b = embedder.embed("hello", Purpose::Search).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[tokio::test]
    async fn never_called_llm_errors() {
        let llm = NeverCalledLlm;
        assert!(llm.complete(LlmRequest::new(vec![])).await.is_err());
    }
}

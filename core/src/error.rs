//! The closed error taxonomy every provider call returns.
//!
//! Every provider failure collapses to one of three kinds — transient,
//! permanent, or malformed — so the orchestrator's retry policy has a
//! single, uniform signal to dispatch on regardless of which provider
//! raised it.

use std::fmt;

/// Coarse classification every [`ProviderError`] carries, used by the
/// orchestrator's retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Worth retrying with backoff: timeouts, rate limits, connection resets.
    Transient,
    /// Not worth retrying: auth failures, bad requests, quota exhaustion.
    Permanent,
    /// The provider replied but the payload didn't conform to the
    /// requested shape. Promoted to `Permanent` after one repair attempt.
    Malformed,
}

/// Error surfaced by any `LanguageModel`, `EmbeddingModel`, `VectorStore`,
/// `GraphStore`, or `HistoryLog` call.
#[derive(Debug)]
pub struct ProviderError {
    kind: ErrorKind,
    source: anyhow::Error,
}

impl ProviderError {
    /// Wraps an error as transient (safe to retry with backoff).
    pub fn transient(source: impl Into<anyhow::Error>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            source: source.into(),
        }
    }

    /// Wraps an error as permanent (not worth retrying).
    pub fn permanent(source: impl Into<anyhow::Error>) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            source: source.into(),
        }
    }

    /// Wraps an error as malformed output (one repair attempt already failed).
    pub fn malformed(source: impl Into<anyhow::Error>) -> Self {
        Self {
            kind: ErrorKind::Malformed,
            source: source.into(),
        }
    }

    /// Returns this error's retry classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Promotes a `Malformed` error to `Permanent`, e.g. after a failed
    /// repair attempt.
    #[must_use]
    pub fn promote_to_permanent(mut self) -> Self {
        self.kind = ErrorKind::Permanent;
        self
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} provider error: {}", self.kind, self.source)
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_changes_kind_only() {
        let err = ProviderError::malformed(anyhow::anyhow!("bad json"));
        assert_eq!(err.kind(), ErrorKind::Malformed);
        let promoted = err.promote_to_permanent();
        assert_eq!(promoted.kind(), ErrorKind::Permanent);
        assert!(promoted.to_string().contains("bad json"));
    }
}

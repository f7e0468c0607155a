//! The orchestrator-facing error taxonomy.
//!
//! A closed `thiserror` enum, one variant per failure class this core can
//! actually produce, since it fans out over five independently-failing
//! provider kinds instead of one.

use memora_core::ProviderError;
use thiserror::Error;

/// Error surfaced by any public orchestrator call.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The caller supplied an empty `(user, agent, session)` scope triple.
    #[error("scope must contain at least one of user, agent, or session")]
    InvalidScope,

    /// Malformed call arguments: unknown filter key, negative limit, etc.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The requested fact id does not exist, or is soft-deleted.
    #[error("not found: {0}")]
    NotFound(String),

    /// A provider call failed. Carries the provider's own error kind.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Reconciliation failed after retries; no vector-layer writes occurred
    /// for the batch.
    #[error("ingest failed: {0}")]
    Ingest(String),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// An invariant was violated. Should be unreachable.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl From<memora_core::scope::InvalidScope> for MemoryError {
    fn from(_: memora_core::scope::InvalidScope) -> Self {
        Self::InvalidScope
    }
}

/// Result type used throughout the orchestrator's public surface.
pub type Result<T> = core::result::Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_scope_converts() {
        let err: MemoryError = memora_core::scope::InvalidScope.into();
        assert!(matches!(err, MemoryError::InvalidScope));
    }

    #[test]
    fn provider_error_wraps_transparently() {
        let provider = ProviderError::transient(anyhow::anyhow!("timeout"));
        let err: MemoryError = provider.into();
        assert!(err.to_string().contains("timeout"));
    }
}

//! Converts text to vector representations for semantic search and
//! similarity scoring.
//!
//! The embedding call carries a [`Purpose`] tag so a provider backed by an asymmetric model (separate
//! document/query encoders) can route the request correctly; symmetric
//! models are free to ignore it.

use crate::ProviderError;
use std::future::Future;

/// Dense vector representation of a piece of text.
pub type Embedding = Vec<f32>;

/// Why a piece of text is being embedded.
///
/// Some embedding APIs use different encoders (or task prefixes) for
/// documents being indexed versus queries being searched; this tag lets a
/// provider pick the right one without the orchestrator knowing the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Embedding a new fact before its first insert.
    Add,
    /// Re-embedding a fact whose content changed.
    Update,
    /// Embedding a query string for similarity search.
    Search,
}

/// Converts text to embedding vectors.
///
/// Implementors must return vectors of length [`EmbeddingModel::dim`] for
/// every call regardless of `purpose`.
pub trait EmbeddingModel: Send + Sync {
    /// Returns the embedding vector dimension produced by this model.
    fn dim(&self) -> usize;

    /// Converts `text` to an embedding vector for the given `purpose`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on provider failure.
    fn embed(
        &self,
        text: &str,
        purpose: Purpose,
    ) -> impl Future<Output = Result<Embedding, ProviderError>> + Send;
}

//! The semantic index every fact is written to and searched through.
//!
//! A scoped, metadata-filtered store: every record carries the scope it
//! belongs to, and every call that touches it is expected to merge a scope
//! filter in before the store ever sees the query.

use crate::ProviderError;
use crate::fact::Metadata;
use crate::scope::Filter;
use std::future::Future;

/// A record persisted in a [`VectorStore`].
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Opaque identifier minted by the store on insert.
    pub id: String,
    /// The fact's text payload.
    pub text: String,
    /// The embedding vector backing similarity search.
    pub embedding: Vec<f32>,
    /// Caller-supplied metadata, including scope keys.
    pub metadata: Metadata,
}

/// A [`StoredRecord`] paired with its similarity score against a query.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    /// The matched record.
    pub record: StoredRecord,
    /// Cosine similarity in `[-1.0, 1.0]`, higher is more similar.
    pub score: f32,
}

/// Persists embedded facts and serves similarity search over them.
///
/// Every method takes an explicit [`Filter`] built from [`crate::scope::Scope::filter`]
/// so implementations never need to reason about multi-tenant isolation
/// themselves — the orchestrator guarantees the filter is always present
/// and always scope-derived.
pub trait VectorStore: Send + Sync {
    /// Inserts a new record, returning the id the store assigned it.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn insert(
        &self,
        text: String,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;

    /// Replaces the text/embedding/metadata of an existing record in place.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if `id` doesn't exist within `filter`, or
    /// on backend failure.
    fn update(
        &self,
        id: &str,
        text: String,
        embedding: Vec<f32>,
        metadata: Metadata,
        filter: &Filter,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Removes a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if `id` doesn't exist within `filter`, or
    /// on backend failure.
    fn remove(
        &self,
        id: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Fetches a single record by id.
    ///
    /// Returns `Ok(None)` if no record with `id` exists within `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn get(
        &self,
        id: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<Option<StoredRecord>, ProviderError>> + Send;

    /// Returns every record matching `filter`, most recently touched first.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn list(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<StoredRecord>, ProviderError>> + Send;

    /// Returns the `top_k` records within `filter` most similar to `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn search(
        &self,
        query: Vec<f32>,
        top_k: usize,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<ScoredRecord>, ProviderError>> + Send;

    /// Removes every record matching `filter` in one call.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn delete_by_scope(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;
}

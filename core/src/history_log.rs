//! The append-only change log's persistence contract.

use crate::ProviderError;
use crate::history::HistoryEntry;
use crate::scope::Filter;
use std::future::Future;

/// Appends and queries the per-fact history log.
///
/// History entries are never mutated or deleted once appended; implementations must reject attempts to do so at the type
/// level by simply not exposing such a method.
pub trait HistoryLog: Send + Sync {
    /// Appends a new entry, assigning it the next sequence number for its
    /// `fact_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn append(
        &self,
        entry: HistoryEntry,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Returns the full, seq-ordered history for one fact.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn for_fact(
        &self,
        fact_id: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<HistoryEntry>, ProviderError>> + Send;
}

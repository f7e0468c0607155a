//! The optional knowledge-graph layer's persistence contract.

use crate::ProviderError;
use crate::graph::{Entity, Relation, RelationMatch};
use std::future::Future;

/// Persists and queries the principal-partitioned knowledge graph.
///
/// Every method is scoped to a single `principal` string ([`crate::scope::Scope::principal`])
/// so a graph store implementation never needs its own notion of
/// multi-tenancy.
pub trait GraphStore: Send + Sync {
    /// Inserts a new entity, returning the id the store assigned it.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn upsert_entity(
        &self,
        label: String,
        type_tag: String,
        principal: &str,
    ) -> impl Future<Output = Result<Entity, ProviderError>> + Send;

    /// Inserts a relation between two entities already in the graph.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn upsert_relation(
        &self,
        relation: Relation,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Returns every entity belonging to `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn entities(
        &self,
        principal: &str,
    ) -> impl Future<Output = Result<Vec<Entity>, ProviderError>> + Send;

    /// Returns every relation belonging to `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn relations(
        &self,
        principal: &str,
    ) -> impl Future<Output = Result<Vec<Relation>, ProviderError>> + Send;

    /// Returns relations belonging to `principal` matching `query_terms`
    /// (naively whitespace-tokenised by the caller), most relevant first,
    /// capped at `limit`.
    ///
    /// Scoring is provider-specific; the core does not prescribe a ranking
    /// function beyond "descending relevance".
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn search(
        &self,
        principal: &str,
        query_terms: &[String],
        limit: usize,
    ) -> impl Future<Output = Result<Vec<RelationMatch>, ProviderError>> + Send;

    /// Removes every entity and relation belonging to `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on backend failure.
    fn delete_by_principal(
        &self,
        principal: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;
}

//! Entities and relations for the optional knowledge-graph layer.
//!
//! An entity is uniquely identified within a principal by `(label,
//! type_tag)`. Relations connect two entities sourced from the same
//! principal; predicates are a bounded-in-intent but not
//! code-enforced vocabulary.

/// A node in the principal-partitioned knowledge graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    /// Opaque identifier minted by the graph store on upsert.
    pub id: String,
    /// Human-readable label, e.g. `"Alice"`.
    pub label: String,
    /// Coarse type tag, e.g. `"person"`, `"place"`.
    pub type_tag: String,
    /// The principal this entity was sourced from.
    pub principal: String,
}

/// A directed edge between two entities sourced from the same principal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relation {
    /// Source entity id.
    pub src: String,
    /// Predicate connecting source and destination, e.g. `"likes"`.
    pub predicate: String,
    /// Destination entity id.
    pub dst: String,
    /// Relation strength/confidence.
    pub weight: f32,
    /// The principal this relation was sourced from.
    pub principal: String,
}

/// A relation returned from [`crate::graph_store::GraphStore::search`],
/// with entity labels resolved for display rather than raw ids.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelationMatch {
    /// Source entity label.
    pub src_label: String,
    /// Predicate connecting source and destination.
    pub predicate: String,
    /// Destination entity label.
    pub dst_label: String,
    /// Provider-specific relevance score against the query terms.
    pub score: f32,
}

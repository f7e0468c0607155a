//! External interface envelopes: plain, serializable request/response
//! structs. Transport binding is out of scope, but the structs are still
//! `serde`-derivable, matching the ambient-stack guarantee that the
//! orchestrator is transport-ready without actually shipping a transport.

use memora_core::{Metadata, Scope};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A request to ingest a batch of conversation messages.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Ordered conversation messages to extract facts from.
    pub messages: Vec<memora_core::Message>,
    /// Principal partition this batch belongs to.
    pub scope: Scope,
    /// Metadata attached to every fact created from this call.
    pub metadata: Metadata,
    /// When `false`, extraction and reconciliation are bypassed: each
    /// message becomes a candidate fact as-is and is unconditionally
    /// ADDed.
    pub infer: bool,
    /// Overrides the built-in extraction prompt for this call.
    pub prompt_override: Option<String>,
}

impl IngestRequest {
    /// Creates an ingest request with `infer=true` and no overrides.
    #[must_use]
    pub fn new(messages: Vec<memora_core::Message>, scope: Scope) -> Self {
        Self {
            messages,
            scope,
            metadata: Metadata::new(),
            infer: true,
            prompt_override: None,
        }
    }

    /// Attaches metadata to every fact created from this call.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Disables extraction/reconciliation; each message becomes an
    /// unconditional ADD.
    #[must_use]
    pub const fn without_inference(mut self) -> Self {
        self.infer = false;
        self
    }

    /// Overrides the built-in extraction prompt for this call.
    #[must_use]
    pub fn with_prompt_override(mut self, prompt: impl Into<String>) -> Self {
        self.prompt_override = Some(prompt.into());
        self
    }
}

/// The kind of transition an [`IngestResultItem`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEvent {
    /// A new fact was created.
    Add,
    /// An existing fact was replaced.
    Update,
    /// A fact was soft-deleted.
    Delete,
}

/// One applied (or failed) decision from an ingest call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResultItem {
    /// Identifier of the affected fact.
    pub id: String,
    /// The fact's text after this transition (pre-transition text on a
    /// failed write, since nothing changed).
    pub memory: String,
    /// The kind of transition that was attempted.
    pub event: ChangeEvent,
    /// The fact's text before an UPDATE; `None` for ADD/DELETE.
    pub previous_memory: Option<String>,
    /// Set when this decision's write failed; sibling decisions still
    /// proceed.
    pub error: Option<String>,
}

/// A request to search the fact store.
#[derive(Debug, Clone)]
pub struct RetrievalQuery {
    /// Natural-language query text.
    pub text: String,
    /// Principal partition to search within.
    pub scope: Scope,
    /// Optional structured metadata-equality filter.
    pub filter: Option<memora_core::scope::Filter>,
    /// Maximum number of results to return.
    pub limit: usize,
    /// Minimum similarity score a result must meet.
    pub threshold: Option<f32>,
}

impl RetrievalQuery {
    /// Creates a retrieval query with the default limit of 100 and no
    /// threshold or filter.
    #[must_use]
    pub fn new(text: impl Into<String>, scope: Scope) -> Self {
        Self {
            text: text.into(),
            scope,
            filter: None,
            limit: 100,
            threshold: None,
        }
    }

    /// Sets a structured metadata-equality filter.
    #[must_use]
    pub fn with_filter(mut self, filter: memora_core::scope::Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Overrides the result limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets a minimum similarity threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// A single matched fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedFact {
    /// The fact's identifier.
    pub id: String,
    /// The fact's text payload.
    pub memory: String,
    /// Similarity score against the query.
    pub score: f32,
    /// The fact's metadata.
    pub metadata: Metadata,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last-update timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// The scope's user component, if any.
    pub user_id: Option<String>,
    /// The scope's agent component, if any.
    pub agent_id: Option<String>,
    /// The scope's session component, if any.
    pub session_id: Option<String>,
}

/// A matched graph relation, returned alongside vector results when a
/// `GraphStore` is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationResult {
    /// Source entity label.
    pub source: String,
    /// Predicate connecting source and destination.
    pub relationship: String,
    /// Destination entity label.
    pub destination: String,
    /// Provider-specific relevance score, if the graph store ranks results.
    pub score: Option<f32>,
}

/// The response to a [`RetrievalQuery`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResponse {
    /// Matched facts, ordered by descending score, ties broken by
    /// descending `updated_at`.
    pub results: Vec<RetrievedFact>,
    /// Matched relations, present only when a `GraphStore` is configured.
    pub relations: Option<Vec<RelationResult>>,
}

/// A candidate fact produced by extraction, prior to reconciliation.
///
/// Transient: never persisted, carries no identifier.
pub type CandidateFact = String;

/// The outcome of reconciliation for one candidate fact.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Create a new fact with `text`.
    Add {
        /// The fact's text.
        text: String,
    },
    /// Replace `existing_id`'s payload with `new_text`.
    Update {
        /// The fact being replaced.
        existing_id: String,
        /// The replacement text.
        new_text: String,
    },
    /// Soft-delete `existing_id`.
    Delete {
        /// The fact being deleted.
        existing_id: String,
    },
    /// No change; the candidate is discarded.
    None,
}

/// The structured shape the extraction LLM call must return.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionBatch {
    /// Extracted candidate facts.
    pub facts: Vec<String>,
}

/// One reconciliation decision as returned by the LLM, before remap
/// resolution.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReconciliationEntry {
    /// Remapped existing-context id (0..N-1), or any value for `ADD`.
    pub id: i64,
    /// The fact's text after this entry is applied.
    pub text: String,
    /// The chosen operation.
    pub event: ReconciliationEvent,
    /// The fact's prior text, when the model knows it.
    #[serde(default)]
    pub old_memory: Option<String>,
}

/// The operation an individual [`ReconciliationEntry`] requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationEvent {
    /// Insert a new fact.
    Add,
    /// Replace an existing fact's payload.
    Update,
    /// Soft-delete an existing fact.
    Delete,
    /// Leave memory unchanged.
    None,
}

/// The structured shape the reconciliation LLM call must return.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReconciliationBatch {
    /// One entry per decision the model made.
    pub memory: Vec<ReconciliationEntry>,
}

/// An extracted entity prior to graph soft-merge.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedEntity {
    /// The entity's label.
    pub label: String,
    /// The entity's coarse type tag.
    #[serde(rename = "type")]
    pub type_tag: String,
}

/// The structured shape the entity-extraction LLM call must return.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntityBatch {
    /// Extracted entities.
    pub entities: Vec<ExtractedEntity>,
}

/// An extracted relation prior to graph soft-merge.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedRelation {
    /// Source entity label.
    pub src_label: String,
    /// Predicate connecting source and destination.
    pub predicate: String,
    /// Destination entity label.
    pub dst_label: String,
    /// Relation strength.
    #[serde(default = "default_relation_weight")]
    pub weight: f32,
}

const fn default_relation_weight() -> f32 {
    1.0
}

/// The structured shape the relation-extraction LLM call must return.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RelationBatch {
    /// Extracted relations.
    pub relations: Vec<ExtractedRelation>,
}

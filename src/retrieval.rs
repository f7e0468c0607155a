//! Retrieval Stage and the fact-lifecycle operations built on the
//! same [`VectorStore`]/[`GraphStore`]/[`HistoryLog`] providers: `get`,
//! `get_all`, `history`, `delete`, `delete_all`, `reset`.
//!
//! History is append-only by construction — [`memora_core::HistoryLog`]
//! exposes no deletion method — so `delete_all` and `reset`
//! below only ever clear vector/graph state; a fact's full change history
//! outlives the fact itself.

use crate::config::OrchestratorConfig;
use crate::error::MemoryError;
use crate::persistence::{self, CREATED_AT_KEY, UPDATED_AT_KEY};
use crate::retry::retry_with_timeout;
use crate::types::{RelationResult, RetrievalQuery, RetrievalResponse, RetrievedFact};
use memora_core::embedding::Purpose;
use memora_core::fact::{Metadata, MetadataValue};
use memora_core::history::HistoryEntry;
use memora_core::scope::{Filter, Scope};
use memora_core::vector_store::StoredRecord;
use memora_core::{EmbeddingModel, GraphStore, HistoryLog, VectorStore};
use time::OffsetDateTime;

const SCOPE_KEYS: [&str; 3] = ["user_id", "agent_id", "session_id"];

/// Runs a similarity search over `query`, optionally enriched with graph
/// relations.
///
/// `graph_enabled` controls whether [`RetrievalResponse::relations`] is
/// populated at all (`None` when no graph store is configured for this
/// orchestrator, `Some` — possibly empty — otherwise), independent of
/// which concrete [`GraphStore`] implementation is wired in.
pub async fn retrieve(
    embedder: &impl EmbeddingModel,
    vector_store: &impl VectorStore,
    graph_store: &impl GraphStore,
    config: &OrchestratorConfig,
    query: &RetrievalQuery,
    graph_enabled: bool,
) -> Result<RetrievalResponse, MemoryError> {
    let filter = memora_core::scope::merge_filters(&query.scope.filter(), query.filter.as_ref());

    let embedding = retry_with_timeout(config.retry_policy(), config.embedder_timeout(), || {
        embedder.embed(&query.text, Purpose::Search)
    })
    .await?;

    let principal = query.scope.principal();
    let query_terms: Vec<String> = query.text.split_whitespace().map(str::to_string).collect();

    let vector_fut = retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        vector_store.search(embedding.clone(), query.limit, &filter)
    });
    let graph_fut = async {
        if graph_enabled {
            retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
                graph_store.search(principal, &query_terms, query.limit)
            })
            .await
            .map(Some)
        } else {
            Ok(None)
        }
    };
    let (scored, matches) = tokio::join!(vector_fut, graph_fut);
    let scored = scored?;
    let matches = matches?;

    let mut results: Vec<RetrievedFact> = scored
        .into_iter()
        .filter(|scored| query.threshold.is_none_or(|threshold| scored.score >= threshold))
        .map(|scored| to_retrieved_fact(scored.record, scored.score))
        .collect();
    results.sort_by(|a, b| b.score.total_cmp(&a.score).then(b.updated_at.cmp(&a.updated_at)));

    let relations = matches.map(|matches| {
        matches
            .into_iter()
            .map(|m| RelationResult {
                source: m.src_label,
                relationship: m.predicate,
                destination: m.dst_label,
                score: Some(m.score),
            })
            .collect()
    });

    Ok(RetrievalResponse { results, relations })
}

/// Fetches a single fact by id within `scope`.
///
/// # Errors
///
/// Returns [`MemoryError::NotFound`] if no fact with `id` exists in this
/// scope, or [`MemoryError::Provider`] on backend failure.
pub async fn get(
    vector_store: &impl VectorStore,
    config: &OrchestratorConfig,
    scope: &Scope,
    id: &str,
) -> Result<RetrievedFact, MemoryError> {
    let filter = scope.filter();
    let record = retry_with_timeout(config.retry_policy(), config.store_timeout(), || vector_store.get(id, &filter))
        .await?
        .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;
    Ok(to_retrieved_fact(record, 1.0))
}

/// Lists every fact in `scope`, optionally narrowed by `filter`, most
/// recently updated first. `limit` caps the number of facts returned;
/// `None` means unbounded, `Some(0)` yields an empty list.
///
/// # Errors
///
/// Returns [`MemoryError::Provider`] on backend failure.
pub async fn get_all(
    vector_store: &impl VectorStore,
    config: &OrchestratorConfig,
    scope: &Scope,
    filter: Option<&Filter>,
    limit: Option<usize>,
) -> Result<Vec<RetrievedFact>, MemoryError> {
    let merged = memora_core::scope::merge_filters(&scope.filter(), filter);
    let records = retry_with_timeout(config.retry_policy(), config.store_timeout(), || vector_store.list(&merged))
        .await?;
    let mut facts: Vec<RetrievedFact> = records.into_iter().map(|record| to_retrieved_fact(record, 1.0)).collect();
    facts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    if let Some(limit) = limit {
        facts.truncate(limit);
    }
    Ok(facts)
}

/// Returns the full, seq-ordered change history for one fact.
///
/// # Errors
///
/// Returns [`MemoryError::Provider`] on backend failure.
pub async fn history(
    history_log: &impl HistoryLog,
    config: &OrchestratorConfig,
    scope: &Scope,
    fact_id: &str,
) -> Result<Vec<HistoryEntry>, MemoryError> {
    let filter = scope.filter();
    Ok(
        retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
            history_log.for_fact(fact_id, &filter)
        })
        .await?,
    )
}

/// Soft-deletes a single fact, appending a `Delete` history entry.
///
/// # Errors
///
/// Returns [`MemoryError::NotFound`] if `id` does not exist in this scope,
/// or [`MemoryError::Provider`] on backend failure.
pub async fn delete(
    vector_store: &impl VectorStore,
    history_log: &impl HistoryLog,
    config: &OrchestratorConfig,
    scope: &Scope,
    id: &str,
) -> Result<(), MemoryError> {
    let filter = scope.filter();
    let existing = retry_with_timeout(config.retry_policy(), config.store_timeout(), || vector_store.get(id, &filter))
        .await?
        .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;

    retry_with_timeout(config.retry_policy(), config.store_timeout(), || vector_store.remove(id, &filter)).await?;

    retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        history_log.append(HistoryEntry {
            fact_id: id.to_string(),
            seq: 0,
            prev_text: Some(existing.text.clone()),
            new_text: None,
            kind: memora_core::history::ChangeKind::Delete,
            scope: scope.clone(),
            at: OffsetDateTime::now_utc(),
        })
    })
    .await?;

    Ok(())
}

/// Removes every fact in `scope` from the vector store in one call.
/// History for those facts is retained.
///
/// # Errors
///
/// Returns [`MemoryError::Provider`] on backend failure.
pub async fn delete_all(
    vector_store: &impl VectorStore,
    config: &OrchestratorConfig,
    scope: &Scope,
) -> Result<(), MemoryError> {
    let filter = scope.filter();
    retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        vector_store.delete_by_scope(&filter)
    })
    .await?;
    Ok(())
}

/// Wipes `scope`'s vector-store facts and the graph's `scope.principal()`
/// partition. History is retained, same as [`delete_all`] — the core's
/// [`HistoryLog`] trait exposes no deletion method at all.
///
/// # Errors
///
/// Returns [`MemoryError::Provider`] on backend failure.
pub async fn reset(
    vector_store: &impl VectorStore,
    graph_store: &impl GraphStore,
    config: &OrchestratorConfig,
    scope: &Scope,
) -> Result<(), MemoryError> {
    delete_all(vector_store, config, scope).await?;
    retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        graph_store.delete_by_principal(scope.principal())
    })
    .await?;
    Ok(())
}

fn to_retrieved_fact(record: StoredRecord, score: f32) -> RetrievedFact {
    let now = OffsetDateTime::now_utc();
    let created_at = persistence::read_timestamp(&record.metadata, CREATED_AT_KEY).unwrap_or(now);
    let updated_at = persistence::read_timestamp(&record.metadata, UPDATED_AT_KEY).unwrap_or(now);
    let user_id = scope_component(&record.metadata, "user_id");
    let agent_id = scope_component(&record.metadata, "agent_id");
    let session_id = scope_component(&record.metadata, "session_id");

    RetrievedFact {
        id: record.id,
        memory: record.text,
        score,
        metadata: visible_metadata(record.metadata),
        created_at,
        updated_at,
        user_id,
        agent_id,
        session_id,
    }
}

fn scope_component(metadata: &Metadata, key: &str) -> Option<String> {
    match metadata.get(key) {
        Some(MetadataValue::String(value)) => Some(value.clone()),
        _ => None,
    }
}

/// Strips scope and timestamp bookkeeping keys, which are exposed as
/// dedicated [`RetrievedFact`] fields, out of the returned metadata map.
fn visible_metadata(mut metadata: Metadata) -> Metadata {
    metadata.remove(CREATED_AT_KEY);
    metadata.remove(UPDATED_AT_KEY);
    for key in SCOPE_KEYS {
        metadata.remove(key);
    }
    metadata
}

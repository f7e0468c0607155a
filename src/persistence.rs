//! Persistence Stage: applies resolved decisions to the vector
//! store and append-only history log, each decision independently.
//!
//! One decision's failure never aborts its siblings — the batch returns a
//! per-decision result list instead of an all-or-nothing outcome.

use crate::config::OrchestratorConfig;
use crate::retry::retry_with_timeout;
use crate::types::{ChangeEvent, Decision, IngestResultItem};
use memora_core::embedding::Purpose;
use memora_core::fact::{Metadata, MetadataValue};
use memora_core::history::{ChangeKind, HistoryEntry};
use memora_core::scope::Scope;
use memora_core::{EmbeddingModel, HistoryLog, ProviderError, VectorStore};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub(crate) const CREATED_AT_KEY: &str = "created_at";
pub(crate) const UPDATED_AT_KEY: &str = "updated_at";

/// Applies every decision in `decisions`, returning one result per
/// decision in the same order.
pub async fn apply_decisions(
    vector_store: &impl VectorStore,
    history_log: &impl HistoryLog,
    embedder: &impl EmbeddingModel,
    config: &OrchestratorConfig,
    scope: &Scope,
    metadata: &Metadata,
    decisions: Vec<Decision>,
) -> Vec<IngestResultItem> {
    let mut results = Vec::with_capacity(decisions.len());
    for decision in decisions {
        let result = match decision {
            Decision::Add { text } => {
                apply_add(vector_store, history_log, embedder, config, scope, metadata, text).await
            }
            Decision::Update {
                existing_id,
                new_text,
            } => {
                apply_update(
                    vector_store,
                    history_log,
                    embedder,
                    config,
                    scope,
                    existing_id,
                    new_text,
                )
                .await
            }
            Decision::Delete { existing_id } => {
                apply_delete(vector_store, history_log, config, scope, existing_id).await
            }
            Decision::None => continue,
        };
        results.push(result);
    }
    results
}

async fn apply_add(
    vector_store: &impl VectorStore,
    history_log: &impl HistoryLog,
    embedder: &impl EmbeddingModel,
    config: &OrchestratorConfig,
    scope: &Scope,
    base_metadata: &Metadata,
    text: String,
) -> IngestResultItem {
    match try_add(vector_store, history_log, embedder, config, scope, base_metadata, &text).await {
        Ok(id) => IngestResultItem {
            id,
            memory: text,
            event: ChangeEvent::Add,
            previous_memory: None,
            error: None,
        },
        Err(err) => {
            tracing::warn!(error = %err, "add decision failed, continuing batch");
            IngestResultItem {
                id: String::new(),
                memory: text,
                event: ChangeEvent::Add,
                previous_memory: None,
                error: Some(err.to_string()),
            }
        }
    }
}

async fn try_add(
    vector_store: &impl VectorStore,
    history_log: &impl HistoryLog,
    embedder: &impl EmbeddingModel,
    config: &OrchestratorConfig,
    scope: &Scope,
    base_metadata: &Metadata,
    text: &str,
) -> Result<String, ProviderError> {
    let embedding = retry_with_timeout(config.retry_policy(), config.embedder_timeout(), || {
        embedder.embed(text, Purpose::Add)
    })
    .await?;
    let now = OffsetDateTime::now_utc();
    let record_metadata = build_metadata(scope, base_metadata, now, now);

    let id = retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        vector_store.insert(text.to_string(), embedding.clone(), record_metadata.clone())
    })
    .await?;

    retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        history_log.append(HistoryEntry {
            fact_id: id.clone(),
            seq: 0,
            prev_text: None,
            new_text: Some(text.to_string()),
            kind: ChangeKind::Add,
            scope: scope.clone(),
            at: now,
        })
    })
    .await?;

    Ok(id)
}

async fn apply_update(
    vector_store: &impl VectorStore,
    history_log: &impl HistoryLog,
    embedder: &impl EmbeddingModel,
    config: &OrchestratorConfig,
    scope: &Scope,
    existing_id: String,
    new_text: String,
) -> IngestResultItem {
    match try_update(vector_store, history_log, embedder, config, scope, &existing_id, &new_text).await {
        Ok(previous_memory) => IngestResultItem {
            id: existing_id,
            memory: new_text,
            event: ChangeEvent::Update,
            previous_memory: Some(previous_memory),
            error: None,
        },
        Err(err) => {
            tracing::warn!(error = %err, id = existing_id, "update decision failed, continuing batch");
            IngestResultItem {
                id: existing_id,
                memory: new_text,
                event: ChangeEvent::Update,
                previous_memory: None,
                error: Some(err.to_string()),
            }
        }
    }
}

async fn try_update(
    vector_store: &impl VectorStore,
    history_log: &impl HistoryLog,
    embedder: &impl EmbeddingModel,
    config: &OrchestratorConfig,
    scope: &Scope,
    existing_id: &str,
    new_text: &str,
) -> Result<String, ProviderError> {
    let filter = scope.filter();
    let existing = retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        vector_store.get(existing_id, &filter)
    })
    .await?
    .ok_or_else(|| ProviderError::permanent(anyhow::anyhow!("fact {existing_id} not found")))?;

    let embedding = retry_with_timeout(config.retry_policy(), config.embedder_timeout(), || {
        embedder.embed(new_text, Purpose::Update)
    })
    .await?;
    let now = OffsetDateTime::now_utc();
    let created_at = read_timestamp(&existing.metadata, CREATED_AT_KEY).unwrap_or(now);
    let record_metadata = build_metadata(scope, &existing.metadata, created_at, now);

    retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        vector_store.update(
            existing_id,
            new_text.to_string(),
            embedding.clone(),
            record_metadata.clone(),
            &filter,
        )
    })
    .await?;

    retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        history_log.append(HistoryEntry {
            fact_id: existing_id.to_string(),
            seq: 0,
            prev_text: Some(existing.text.clone()),
            new_text: Some(new_text.to_string()),
            kind: ChangeKind::Update,
            scope: scope.clone(),
            at: now,
        })
    })
    .await?;

    Ok(existing.text.clone())
}

async fn apply_delete(
    vector_store: &impl VectorStore,
    history_log: &impl HistoryLog,
    config: &OrchestratorConfig,
    scope: &Scope,
    existing_id: String,
) -> IngestResultItem {
    match try_delete(vector_store, history_log, config, scope, &existing_id).await {
        Ok(text) => IngestResultItem {
            id: existing_id,
            memory: text,
            event: ChangeEvent::Delete,
            previous_memory: None,
            error: None,
        },
        Err(err) => {
            tracing::warn!(error = %err, id = existing_id, "delete decision failed, continuing batch");
            IngestResultItem {
                id: existing_id,
                memory: String::new(),
                event: ChangeEvent::Delete,
                previous_memory: None,
                error: Some(err.to_string()),
            }
        }
    }
}

async fn try_delete(
    vector_store: &impl VectorStore,
    history_log: &impl HistoryLog,
    config: &OrchestratorConfig,
    scope: &Scope,
    existing_id: &str,
) -> Result<String, ProviderError> {
    let filter = scope.filter();
    let existing = retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        vector_store.get(existing_id, &filter)
    })
    .await?
    .ok_or_else(|| ProviderError::permanent(anyhow::anyhow!("fact {existing_id} not found")))?;

    retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        vector_store.remove(existing_id, &filter)
    })
    .await?;

    let now = OffsetDateTime::now_utc();
    retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        history_log.append(HistoryEntry {
            fact_id: existing_id.to_string(),
            seq: 0,
            prev_text: Some(existing.text.clone()),
            new_text: None,
            kind: ChangeKind::Delete,
            scope: scope.clone(),
            at: now,
        })
    })
    .await?;

    Ok(existing.text.clone())
}

fn build_metadata(
    scope: &Scope,
    base: &Metadata,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
) -> Metadata {
    let mut metadata = base.clone();
    for (key, value) in scope.filter() {
        metadata.insert(key, MetadataValue::String(value));
    }
    metadata.insert(CREATED_AT_KEY.to_string(), MetadataValue::String(format_timestamp(created_at)));
    metadata.insert(UPDATED_AT_KEY.to_string(), MetadataValue::String(format_timestamp(updated_at)));
    metadata
}

fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_default()
}

/// Reads a timestamp previously written by [`build_metadata`]. Used by the
/// retrieval stage to populate `created_at`/`updated_at` on result facts.
pub(crate) fn read_timestamp(metadata: &Metadata, key: &str) -> Option<OffsetDateTime> {
    match metadata.get(key) {
        Some(MetadataValue::String(text)) => OffsetDateTime::parse(text, &Rfc3339).ok(),
        _ => None,
    }
}

//! Reconciliation Stage: for each candidate fact, decides how it
//! reconciles with existing memory. The hard core of the system.

use crate::config::OrchestratorConfig;
use crate::error::MemoryError;
use crate::retry::retry_with_timeout;
use crate::types::{CandidateFact, Decision, ReconciliationBatch, ReconciliationEvent};
use memora_core::embedding::Purpose;
use memora_core::llm::oneshot;
use memora_core::scope::Scope;
use memora_core::vector_store::StoredRecord;
use memora_core::{EmbeddingModel, LanguageModel, VectorStore};
use serde::Serialize;
use std::collections::HashMap;

/// A small-integer-keyed view of an existing fact, shown to the LLM instead
/// of its real store id.
#[derive(Debug, Clone, Serialize)]
struct ExistingContextEntry {
    id: usize,
    text: String,
}

/// Reconciles `candidates` against existing memory within `scope`, issuing
/// one LLM call, and returns the resolved decisions with real store ids.
///
/// # Errors
///
/// Returns [`MemoryError::Ingest`] if the reconciliation LLM call fails
/// after retries: no partial decisions are returned, and the
/// caller must not apply any writes for this batch.
pub async fn reconcile(
    llm: &impl LanguageModel,
    embedder: &impl EmbeddingModel,
    vector_store: &impl VectorStore,
    config: &OrchestratorConfig,
    scope: &Scope,
    candidates: &[CandidateFact],
) -> Result<Vec<Decision>, MemoryError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let neighbors = gather_existing_context(embedder, vector_store, config, scope, candidates).await?;
    let (ids, context_entries) = build_remap(&neighbors);

    let prompt = build_prompt(config, &context_entries, candidates);
    let request = oneshot(config.reconciliation_prompt(), prompt);

    let batch: ReconciliationBatch = retry_with_timeout(config.retry_policy(), config.llm_timeout(), || {
        llm.generate::<ReconciliationBatch>(request.clone())
    })
    .await
    .map_err(|err| MemoryError::Ingest(err.to_string()))?;

    Ok(resolve_decisions(batch, &ids))
}

async fn gather_existing_context(
    embedder: &impl EmbeddingModel,
    vector_store: &impl VectorStore,
    config: &OrchestratorConfig,
    scope: &Scope,
    candidates: &[CandidateFact],
) -> Result<Vec<StoredRecord>, MemoryError> {
    let filter = scope.filter();
    let mut union: Vec<StoredRecord> = Vec::new();
    let mut seen_ids = std::collections::HashSet::new();

    for candidate in candidates {
        let embedding = retry_with_timeout(config.retry_policy(), config.embedder_timeout(), || {
            embedder.embed(candidate, Purpose::Add)
        })
        .await?;
        let neighbors = retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
            vector_store.search(embedding.clone(), config.reconciliation_neighbors(), &filter)
        })
        .await?;
        for scored in neighbors {
            if seen_ids.insert(scored.record.id.clone()) {
                union.push(scored.record);
            }
        }
    }
    Ok(union)
}

fn build_remap(neighbors: &[StoredRecord]) -> (Vec<String>, Vec<ExistingContextEntry>) {
    let ids: Vec<String> = neighbors.iter().map(|record| record.id.clone()).collect();
    let entries = neighbors
        .iter()
        .enumerate()
        .map(|(index, record)| ExistingContextEntry {
            id: index,
            text: record.text.clone(),
        })
        .collect();
    (ids, entries)
}

fn build_prompt(
    config: &OrchestratorConfig,
    context: &[ExistingContextEntry],
    candidates: &[CandidateFact],
) -> String {
    let context_json = serde_json::to_string_pretty(context).unwrap_or_else(|_| "[]".to_string());
    let candidates_json =
        serde_json::to_string_pretty(candidates).unwrap_or_else(|_| "[]".to_string());
    format!(
        "{instructions}\n\nExisting memory (id, text):\n{context_json}\n\nCandidate facts:\n{candidates_json}",
        instructions = config.reconciliation_prompt()
    )
}

fn resolve_decisions(batch: ReconciliationBatch, ids: &[String]) -> Vec<Decision> {
    let mut decisions: Vec<Decision> = Vec::new();
    // Tracks the output index of the most recent decision targeting a given
    // existing id, so a later entry can supersede an earlier one within the
    // same batch.
    let mut last_index_for_id: HashMap<String, usize> = HashMap::new();

    for entry in batch.memory {
        match entry.event {
            ReconciliationEvent::Add => {
                decisions.push(Decision::Add { text: entry.text });
            }
            ReconciliationEvent::Update => {
                let Some(real_id) = remap_lookup(entry.id, ids) else {
                    tracing::warn!(id = entry.id, "update referenced an unknown id; downgrading to add");
                    decisions.push(Decision::Add { text: entry.text });
                    continue;
                };
                supersede(&mut decisions, &mut last_index_for_id, real_id.clone());
                decisions.push(Decision::Update {
                    existing_id: real_id,
                    new_text: entry.text,
                });
            }
            ReconciliationEvent::Delete => {
                let Some(real_id) = remap_lookup(entry.id, ids) else {
                    tracing::warn!(id = entry.id, "delete referenced an unknown id; dropping decision");
                    continue;
                };
                supersede(&mut decisions, &mut last_index_for_id, real_id.clone());
                decisions.push(Decision::Delete { existing_id: real_id });
            }
            ReconciliationEvent::None => {}
        }
    }

    decisions.retain(|decision| *decision != Decision::None);
    decisions
}

fn supersede(
    decisions: &mut [Decision],
    last_index_for_id: &mut HashMap<String, usize>,
    real_id: String,
) {
    if let Some(&previous_index) = last_index_for_id.get(&real_id) {
        decisions[previous_index] = Decision::None;
    }
    last_index_for_id.insert(real_id, decisions.len());
}

fn remap_lookup(id: i64, ids: &[String]) -> Option<String> {
    usize::try_from(id).ok().and_then(|i| ids.get(i)).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::InMemoryVectorStore;
    use crate::testing::{DeterministicEmbedder, ScriptedLlm};
    use memora_core::fact::Metadata;

    #[tokio::test]
    async fn add_decision_for_novel_candidate() {
        let llm = ScriptedLlm::always(
            r#"{"memory":[{"id":0,"text":"User loves pizza","event":"ADD"}]}"#,
        );
        let embedder = DeterministicEmbedder::new(4);
        let store = InMemoryVectorStore::new();
        let config = OrchestratorConfig::default();
        let scope = Scope::for_user("u1").unwrap();

        let decisions = reconcile(
            &llm,
            &embedder,
            &store,
            &config,
            &scope,
            &["User loves pizza".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(
            decisions,
            vec![Decision::Add {
                text: "User loves pizza".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn update_resolves_remapped_id_to_real_store_id() {
        let embedder = DeterministicEmbedder::new(4);
        let store = InMemoryVectorStore::new();
        let embedding = embedder.embed("User loves pizza", Purpose::Add).await.unwrap();
        let real_id = store
            .insert("User loves pizza".into(), embedding, Metadata::new())
            .await
            .unwrap();

        let llm = ScriptedLlm::always(
            r#"{"memory":[{"id":0,"text":"User loves pasta","event":"UPDATE","old_memory":"User loves pizza"}]}"#,
        );
        let config = OrchestratorConfig::default();
        let scope = Scope::for_user("u1").unwrap();

        let decisions = reconcile(
            &llm,
            &embedder,
            &store,
            &config,
            &scope,
            &["Actually I prefer pasta".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(
            decisions,
            vec![Decision::Update {
                existing_id: real_id,
                new_text: "User loves pasta".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn update_on_unresolvable_id_downgrades_to_add() {
        let llm = ScriptedLlm::always(
            r#"{"memory":[{"id":99,"text":"orphaned update","event":"UPDATE"}]}"#,
        );
        let embedder = DeterministicEmbedder::new(4);
        let store = InMemoryVectorStore::new();
        let config = OrchestratorConfig::default();
        let scope = Scope::for_user("u1").unwrap();

        let decisions = reconcile(&llm, &embedder, &store, &config, &scope, &["x".to_string()])
            .await
            .unwrap();

        assert_eq!(
            decisions,
            vec![Decision::Add {
                text: "orphaned update".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn delete_on_unresolvable_id_is_dropped() {
        let llm = ScriptedLlm::always(
            r#"{"memory":[{"id":99,"text":"irrelevant","event":"DELETE"}]}"#,
        );
        let embedder = DeterministicEmbedder::new(4);
        let store = InMemoryVectorStore::new();
        let config = OrchestratorConfig::default();
        let scope = Scope::for_user("u1").unwrap();

        let decisions = reconcile(&llm, &embedder, &store, &config, &scope, &["x".to_string()])
            .await
            .unwrap();

        assert!(decisions.is_empty());
    }

    #[tokio::test]
    async fn none_entries_are_discarded() {
        let llm = ScriptedLlm::always(r#"{"memory":[{"id":0,"text":"x","event":"NONE"}]}"#);
        let embedder = DeterministicEmbedder::new(4);
        let store = InMemoryVectorStore::new();
        let config = OrchestratorConfig::default();
        let scope = Scope::for_user("u1").unwrap();

        let decisions = reconcile(&llm, &embedder, &store, &config, &scope, &["x".to_string()])
            .await
            .unwrap();
        assert!(decisions.is_empty());
    }

    #[tokio::test]
    async fn last_decision_wins_when_same_id_targeted_twice() {
        let embedder = DeterministicEmbedder::new(4);
        let store = InMemoryVectorStore::new();
        let embedding = embedder.embed("seed", Purpose::Add).await.unwrap();
        let real_id = store
            .insert("seed".into(), embedding, Metadata::new())
            .await
            .unwrap();

        let llm = ScriptedLlm::always(
            r#"{"memory":[
                {"id":0,"text":"first update","event":"UPDATE"},
                {"id":0,"text":"final update","event":"UPDATE"}
            ]}"#,
        );
        let config = OrchestratorConfig::default();
        let scope = Scope::for_user("u1").unwrap();

        let decisions = reconcile(&llm, &embedder, &store, &config, &scope, &["x".to_string()])
            .await
            .unwrap();

        assert_eq!(
            decisions,
            vec![Decision::Update {
                existing_id: real_id,
                new_text: "final update".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn empty_candidates_skip_the_llm_entirely() {
        use crate::testing::NeverCalledLlm;
        let llm = NeverCalledLlm;
        let embedder = DeterministicEmbedder::new(4);
        let store = InMemoryVectorStore::new();
        let config = OrchestratorConfig::default();
        let scope = Scope::for_user("u1").unwrap();

        let decisions = reconcile(&llm, &embedder, &store, &config, &scope, &[])
            .await
            .unwrap();
        assert!(decisions.is_empty());
    }

    #[tokio::test]
    async fn reconciliation_llm_failure_yields_ingest_error() {
        use crate::testing::NeverCalledLlm;
        let llm = NeverCalledLlm;
        let embedder = DeterministicEmbedder::new(4);
        let store = InMemoryVectorStore::new();
        let config = OrchestratorConfig::default();
        let scope = Scope::for_user("u1").unwrap();

        let result = reconcile(&llm, &embedder, &store, &config, &scope, &["x".to_string()]).await;
        assert!(matches!(result, Err(MemoryError::Ingest(_))));
    }
}

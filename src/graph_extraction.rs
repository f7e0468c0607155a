//! Graph Extraction Stage: mines entities and relations from the
//! same conversation text ingest extracts facts from, and soft-merges
//! them into the principal-partitioned knowledge graph.
//!
//! Runs only when a `GraphStore` is configured. Every failure here is swallowed with a logged
//! warning — a broken graph call must never fail vector-layer ingest.

use crate::config::OrchestratorConfig;
use crate::retry::retry_with_timeout;
use crate::types::{EntityBatch, ExtractedEntity, RelationBatch};
use memora_core::embedding::Purpose;
use memora_core::graph::{Entity, Relation};
use memora_core::llm::oneshot;
use memora_core::{EmbeddingModel, GraphStore, LanguageModel, ProviderError};
use std::collections::HashMap;

const ENTITY_PROMPT: &str = "Extract the named entities (people, places, organizations, things) \
    mentioned in the conversation below. For each, give a short label and a coarse type tag \
    (e.g. person, place, organization, object).";

const RELATION_PROMPT: &str = "Given the conversation and the entities already identified, \
    extract the relationships between them as (source entity, predicate, destination entity) \
    triples. Use only the entity labels provided. Predicates should be short verb phrases, \
    e.g. \"lives_in\", \"works_at\", \"likes\".";

/// Extracts entities and relations from `text` and merges them into the
/// graph scoped to `principal`. Never returns an error: failures degrade
/// to a partial or empty outcome, logged at `warn`.
pub async fn extract_graph(
    llm: &impl LanguageModel,
    embedder: &impl EmbeddingModel,
    graph_store: &impl GraphStore,
    config: &OrchestratorConfig,
    principal: &str,
    text: &str,
    graph_enabled: bool,
) {
    if !graph_enabled || text.trim().is_empty() {
        return;
    }

    let Some(entity_batch) = extract_entities(llm, config, text).await else {
        return;
    };
    if entity_batch.entities.is_empty() {
        return;
    }

    let mut label_to_entity: HashMap<String, Entity> = HashMap::new();
    for extracted in &entity_batch.entities {
        match merge_or_create_entity(embedder, graph_store, config, principal, extracted).await {
            Ok(entity) => {
                label_to_entity.insert(extracted.label.clone(), entity);
            }
            Err(err) => {
                tracing::warn!(error = %err, label = extracted.label, "failed to upsert entity, skipping");
            }
        }
    }

    let labels: Vec<&str> = entity_batch.entities.iter().map(|e| e.label.as_str()).collect();
    let Some(relation_batch) = extract_relations(llm, config, text, &labels).await else {
        return;
    };

    for extracted in relation_batch.relations {
        let Some(src) = label_to_entity.get(&extracted.src_label) else {
            tracing::warn!(label = extracted.src_label, "relation references unknown source entity, skipping");
            continue;
        };
        let Some(dst) = label_to_entity.get(&extracted.dst_label) else {
            tracing::warn!(label = extracted.dst_label, "relation references unknown destination entity, skipping");
            continue;
        };
        let relation = Relation {
            src: src.id.clone(),
            predicate: extracted.predicate,
            dst: dst.id.clone(),
            weight: extracted.weight,
            principal: principal.to_string(),
        };
        if let Err(err) = retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
            graph_store.upsert_relation(relation.clone())
        })
        .await
        {
            tracing::warn!(error = %err, "failed to upsert relation, skipping");
        }
    }
}

async fn extract_entities(
    llm: &impl LanguageModel,
    config: &OrchestratorConfig,
    text: &str,
) -> Option<EntityBatch> {
    let request = oneshot(ENTITY_PROMPT, text);
    match retry_with_timeout(config.retry_policy(), config.llm_timeout(), || {
        llm.generate::<EntityBatch>(request.clone())
    })
    .await
    {
        Ok(batch) => Some(batch),
        Err(err) => {
            tracing::warn!(error = %err, "entity extraction failed after retries");
            None
        }
    }
}

async fn extract_relations(
    llm: &impl LanguageModel,
    config: &OrchestratorConfig,
    text: &str,
    labels: &[&str],
) -> Option<RelationBatch> {
    let prompt = format!("Entities: {}\n\nConversation:\n{}", labels.join(", "), text);
    let request = oneshot(RELATION_PROMPT, prompt);
    match retry_with_timeout(config.retry_policy(), config.llm_timeout(), || {
        llm.generate::<RelationBatch>(request.clone())
    })
    .await
    {
        Ok(batch) => Some(batch),
        Err(err) => {
            tracing::warn!(error = %err, "relation extraction failed after retries");
            None
        }
    }
}

async fn merge_or_create_entity(
    embedder: &impl EmbeddingModel,
    graph_store: &impl GraphStore,
    config: &OrchestratorConfig,
    principal: &str,
    extracted: &ExtractedEntity,
) -> Result<Entity, ProviderError> {
    let existing = retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        graph_store.entities(principal)
    })
    .await?;
    if existing.is_empty() {
        return retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
            graph_store.upsert_entity(extracted.label.clone(), extracted.type_tag.clone(), principal)
        })
        .await;
    }

    let query_embedding = retry_with_timeout(config.retry_policy(), config.embedder_timeout(), || {
        embedder.embed(&extracted.label, Purpose::Add)
    })
    .await?;

    let mut scored: Vec<(f32, &Entity)> = Vec::with_capacity(existing.len());
    for candidate in &existing {
        let candidate_embedding = retry_with_timeout(config.retry_policy(), config.embedder_timeout(), || {
            embedder.embed(&candidate.label, Purpose::Add)
        })
        .await?;
        scored.push((cosine_similarity(&query_embedding, &candidate_embedding), candidate));
    }
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(config.graph_merge_top_k());

    if let Some((score, best)) = scored.first() {
        if *score >= config.graph_merge_threshold() {
            return Ok((*best).clone());
        }
    }

    retry_with_timeout(config.retry_policy(), config.store_timeout(), || {
        graph_store.upsert_entity(extracted.label.clone(), extracted.type_tag.clone(), principal)
    })
    .await
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a.sqrt() * mag_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::InMemoryGraphStore;
    use crate::testing::{DeterministicEmbedder, NeverCalledLlm, ScriptedLlm};

    #[tokio::test]
    async fn blank_text_skips_extraction_entirely() {
        let llm = NeverCalledLlm;
        let embedder = DeterministicEmbedder::new(4);
        let graph = InMemoryGraphStore::new();
        let config = OrchestratorConfig::default();
        extract_graph(&llm, &embedder, &graph, &config, "u1", "   ", true).await;
        assert!(graph.entities("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_graph_skips_even_with_real_text() {
        let llm = NeverCalledLlm;
        let embedder = DeterministicEmbedder::new(4);
        let graph = InMemoryGraphStore::new();
        let config = OrchestratorConfig::default();
        extract_graph(&llm, &embedder, &graph, &config, "u1", "Alice lives in Paris.", false).await;
        assert!(graph.entities("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn extracts_entities_and_relations_into_graph() {
        let llm = ScriptedLlm::new([
            r#"{"entities":[{"label":"Alice","type":"person"},{"label":"Paris","type":"place"}]}"#,
            r#"{"relations":[{"src_label":"Alice","predicate":"lives_in","dst_label":"Paris","weight":1.0}]}"#,
        ]);
        let embedder = DeterministicEmbedder::new(4);
        let graph = InMemoryGraphStore::new();
        let config = OrchestratorConfig::default();

        extract_graph(&llm, &embedder, &graph, &config, "u1", "Alice lives in Paris.", true).await;

        let entities = graph.entities("u1").await.unwrap();
        assert_eq!(entities.len(), 2);
        let relations = graph.relations("u1").await.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].predicate, "lives_in");
    }

    #[tokio::test]
    async fn second_mention_of_same_label_reuses_existing_entity() {
        let llm = ScriptedLlm::new([
            r#"{"entities":[{"label":"Alice","type":"person"}]}"#,
            r#"{"relations":[]}"#,
            r#"{"entities":[{"label":"Alice","type":"person"}]}"#,
            r#"{"relations":[]}"#,
        ]);
        let embedder = DeterministicEmbedder::new(4);
        let graph = InMemoryGraphStore::new();
        let config = OrchestratorConfig::default();

        extract_graph(&llm, &embedder, &graph, &config, "u1", "Alice said hi.", true).await;
        extract_graph(&llm, &embedder, &graph, &config, "u1", "Alice said hi again.", true).await;

        assert_eq!(graph.entities("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn entity_extraction_failure_degrades_to_no_graph_writes() {
        let llm = ScriptedLlm::always("not json");
        let embedder = DeterministicEmbedder::new(4);
        let graph = InMemoryGraphStore::new();
        let config = OrchestratorConfig::default();

        extract_graph(&llm, &embedder, &graph, &config, "u1", "Alice lives in Paris.", true).await;
        assert!(graph.entities("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn relation_referencing_unknown_label_is_skipped() {
        let llm = ScriptedLlm::new([
            r#"{"entities":[{"label":"Alice","type":"person"}]}"#,
            r#"{"relations":[{"src_label":"Alice","predicate":"lives_in","dst_label":"Nowhere","weight":1.0}]}"#,
        ]);
        let embedder = DeterministicEmbedder::new(4);
        let graph = InMemoryGraphStore::new();
        let config = OrchestratorConfig::default();

        extract_graph(&llm, &embedder, &graph, &config, "u1", "Alice lives somewhere.", true).await;
        assert!(graph.relations("u1").await.unwrap().is_empty());
    }
}

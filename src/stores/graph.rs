//! An in-process reference [`GraphStore`] implementation.
//!
//! Principal-partitioned, `(entity_id, principal)`-keyed records plus
//! `(src_id, predicate, dst_id, principal)` edges. Entities and relations
//! form a general directed graph; no raw pointers are kept, so every
//! traversal goes through the store.

use async_lock::Mutex;
use memora_core::graph::{Entity, Relation, RelationMatch};
use memora_core::graph_store::GraphStore;
use memora_core::ProviderError;
use uuid::Uuid;

/// An in-memory, principal-partitioned [`GraphStore`].
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    entities: Mutex<Vec<Entity>>,
    relations: Mutex<Vec<Relation>>,
}

impl InMemoryGraphStore {
    /// Creates an empty graph store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entities: Mutex::new(Vec::new()),
            relations: Mutex::new(Vec::new()),
        }
    }
}

impl GraphStore for InMemoryGraphStore {
    async fn upsert_entity(
        &self,
        label: String,
        type_tag: String,
        principal: &str,
    ) -> Result<Entity, ProviderError> {
        let mut entities = self.entities.lock().await;
        if let Some(existing) = entities
            .iter()
            .find(|e| e.principal == principal && e.label == label && e.type_tag == type_tag)
        {
            return Ok(existing.clone());
        }
        let entity = Entity {
            id: Uuid::new_v4().to_string(),
            label,
            type_tag,
            principal: principal.to_string(),
        };
        entities.push(entity.clone());
        Ok(entity)
    }

    async fn upsert_relation(&self, relation: Relation) -> Result<(), ProviderError> {
        let mut relations = self.relations.lock().await;
        if let Some(existing) = relations.iter_mut().find(|r| {
            r.principal == relation.principal
                && r.src == relation.src
                && r.predicate == relation.predicate
                && r.dst == relation.dst
        }) {
            existing.weight = relation.weight;
        } else {
            relations.push(relation);
        }
        Ok(())
    }

    async fn entities(&self, principal: &str) -> Result<Vec<Entity>, ProviderError> {
        let entities = self.entities.lock().await;
        Ok(entities
            .iter()
            .filter(|e| e.principal == principal)
            .cloned()
            .collect())
    }

    async fn relations(&self, principal: &str) -> Result<Vec<Relation>, ProviderError> {
        let relations = self.relations.lock().await;
        Ok(relations
            .iter()
            .filter(|r| r.principal == principal)
            .cloned()
            .collect())
    }

    async fn search(
        &self,
        principal: &str,
        query_terms: &[String],
        limit: usize,
    ) -> Result<Vec<RelationMatch>, ProviderError> {
        let entities = self.entities.lock().await;
        let by_id = |id: &str| entities.iter().find(|e| e.id == id).map(|e| e.label.clone());
        let relations = self.relations.lock().await;
        let lowercase_terms: Vec<String> = query_terms.iter().map(|t| t.to_lowercase()).collect();

        let mut scored: Vec<RelationMatch> = relations
            .iter()
            .filter(|r| r.principal == principal)
            .filter_map(|r| {
                let src_label = by_id(&r.src)?;
                let dst_label = by_id(&r.dst)?;
                let haystack = format!("{src_label} {} {dst_label}", r.predicate).to_lowercase();
                let hits = lowercase_terms
                    .iter()
                    .filter(|term| !term.is_empty() && haystack.contains(term.as_str()))
                    .count();
                if lowercase_terms.is_empty() || hits > 0 {
                    let score = if lowercase_terms.is_empty() {
                        r.weight
                    } else {
                        (hits as f32 / lowercase_terms.len() as f32) * r.weight.max(0.01)
                    };
                    Some(RelationMatch {
                        src_label,
                        predicate: r.predicate.clone(),
                        dst_label,
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete_by_principal(&self, principal: &str) -> Result<(), ProviderError> {
        let mut entities = self.entities.lock().await;
        entities.retain(|e| e.principal != principal);
        let mut relations = self.relations.lock().await;
        relations.retain(|r| r.principal != principal);
        Ok(())
    }
}

/// A [`GraphStore`] that performs no writes and returns empty results,
/// mirroring the [`crate::telemetry::NoopSink`] pattern for the optional
/// knowledge-graph layer.
///
/// Used as the default graph store when an orchestrator is built without
/// one, so every pipeline stage can stay generic over a single `GraphStore`
/// type parameter instead of branching on `Option`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGraphStore;

impl GraphStore for NoopGraphStore {
    async fn upsert_entity(
        &self,
        label: String,
        type_tag: String,
        principal: &str,
    ) -> Result<Entity, ProviderError> {
        Ok(Entity {
            id: String::new(),
            label,
            type_tag,
            principal: principal.to_string(),
        })
    }

    async fn upsert_relation(&self, _relation: Relation) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn entities(&self, _principal: &str) -> Result<Vec<Entity>, ProviderError> {
        Ok(Vec::new())
    }

    async fn relations(&self, _principal: &str) -> Result<Vec<Relation>, ProviderError> {
        Ok(Vec::new())
    }

    async fn search(
        &self,
        _principal: &str,
        _query_terms: &[String],
        _limit: usize,
    ) -> Result<Vec<RelationMatch>, ProviderError> {
        Ok(Vec::new())
    }

    async fn delete_by_principal(&self, _principal: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_entity_is_idempotent_on_label_and_type() {
        let store = InMemoryGraphStore::new();
        let first = store
            .upsert_entity("Alice".into(), "person".into(), "u1")
            .await
            .unwrap();
        let second = store
            .upsert_entity("Alice".into(), "person".into(), "u1")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.entities("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_by_principal_only_affects_one_principal() {
        let store = InMemoryGraphStore::new();
        store
            .upsert_entity("Alice".into(), "person".into(), "u1")
            .await
            .unwrap();
        store
            .upsert_entity("Bob".into(), "person".into(), "u2")
            .await
            .unwrap();
        store.delete_by_principal("u1").await.unwrap();
        assert!(store.entities("u1").await.unwrap().is_empty());
        assert_eq!(store.entities("u2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_matches_query_terms_against_labels_and_predicate() {
        let store = InMemoryGraphStore::new();
        let a = store
            .upsert_entity("Alice".into(), "person".into(), "u1")
            .await
            .unwrap();
        let b = store
            .upsert_entity("Paris".into(), "place".into(), "u1")
            .await
            .unwrap();
        store
            .upsert_relation(Relation {
                src: a.id.clone(),
                predicate: "lives_in".into(),
                dst: b.id.clone(),
                weight: 1.0,
                principal: "u1".into(),
            })
            .await
            .unwrap();

        let results = store
            .search("u1", &["paris".to_string()], 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].dst_label, "Paris");

        let no_match = store
            .search("u1", &["tokyo".to_string()], 10)
            .await
            .unwrap();
        assert!(no_match.is_empty());
    }

    #[tokio::test]
    async fn relations_scoped_by_principal() {
        let store = InMemoryGraphStore::new();
        let a = store
            .upsert_entity("Alice".into(), "person".into(), "u1")
            .await
            .unwrap();
        let b = store
            .upsert_entity("Paris".into(), "place".into(), "u1")
            .await
            .unwrap();
        store
            .upsert_relation(Relation {
                src: a.id.clone(),
                predicate: "lives_in".into(),
                dst: b.id.clone(),
                weight: 1.0,
                principal: "u1".into(),
            })
            .await
            .unwrap();
        assert_eq!(store.relations("u1").await.unwrap().len(), 1);
        assert!(store.relations("u2").await.unwrap().is_empty());
    }
}

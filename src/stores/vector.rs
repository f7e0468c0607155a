//! An in-process reference [`VectorStore`] implementation.
//!
//! O(N) linear scan over an `async-lock`-guarded `Vec`, scored by cosine
//! similarity on every search, filtered by the scope/metadata map the
//! persistence and retrieval stages supply. Not persistent, not meant for
//! production scale — exists so the orchestrator and its tests have a real,
//! runnable default.

use async_lock::Mutex;
use memora_core::fact::Metadata;
use memora_core::scope::Filter;
use memora_core::vector_store::{ScoredRecord, StoredRecord, VectorStore};
use memora_core::ProviderError;
use uuid::Uuid;

/// An in-memory, linear-scan [`VectorStore`].
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    records: Mutex<Vec<StoredRecord>>,
}

impl InMemoryVectorStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    fn matches(metadata: &Metadata, filter: &Filter) -> bool {
        filter.iter().all(|(key, value)| {
            metadata
                .get(key)
                .is_some_and(|found| metadata_matches(found, value))
        })
    }
}

fn metadata_matches(value: &memora_core::MetadataValue, expected: &str) -> bool {
    match value {
        memora_core::MetadataValue::String(s) => s == expected,
        memora_core::MetadataValue::Number(n) => n.to_string() == expected,
        memora_core::MetadataValue::Bool(b) => b.to_string() == expected,
    }
}

impl VectorStore for InMemoryVectorStore {
    async fn insert(
        &self,
        text: String,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Result<String, ProviderError> {
        let id = Uuid::new_v4().to_string();
        let mut records = self.records.lock().await;
        records.push(StoredRecord {
            id: id.clone(),
            text,
            embedding,
            metadata,
        });
        Ok(id)
    }

    async fn update(
        &self,
        id: &str,
        text: String,
        embedding: Vec<f32>,
        metadata: Metadata,
        filter: &Filter,
    ) -> Result<(), ProviderError> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|record| record.id == id && Self::matches(&record.metadata, filter))
            .ok_or_else(|| ProviderError::permanent(anyhow::anyhow!("record {id} not found")))?;
        record.text = text;
        record.embedding = embedding;
        record.metadata = metadata;
        Ok(())
    }

    async fn remove(&self, id: &str, filter: &Filter) -> Result<(), ProviderError> {
        let mut records = self.records.lock().await;
        let position = records
            .iter()
            .position(|record| record.id == id && Self::matches(&record.metadata, filter))
            .ok_or_else(|| ProviderError::permanent(anyhow::anyhow!("record {id} not found")))?;
        records.remove(position);
        Ok(())
    }

    async fn get(&self, id: &str, filter: &Filter) -> Result<Option<StoredRecord>, ProviderError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .find(|record| record.id == id && Self::matches(&record.metadata, filter))
            .cloned())
    }

    async fn list(&self, filter: &Filter) -> Result<Vec<StoredRecord>, ProviderError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|record| Self::matches(&record.metadata, filter))
            .cloned()
            .collect())
    }

    async fn search(
        &self,
        query: Vec<f32>,
        top_k: usize,
        filter: &Filter,
    ) -> Result<Vec<ScoredRecord>, ProviderError> {
        let records = self.records.lock().await;
        let mut scored: Vec<ScoredRecord> = records
            .iter()
            .filter(|record| Self::matches(&record.metadata, filter))
            .map(|record| ScoredRecord {
                score: cosine_similarity(&query, &record.embedding),
                record: record.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_by_scope(&self, filter: &Filter) -> Result<(), ProviderError> {
        let mut records = self.records.lock().await;
        records.retain(|record| !Self::matches(&record.metadata, filter));
        Ok(())
    }
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

    fn filter_with(key: &str, value: &str) -> Filter {
        let mut filter = Filter::new();
        filter.insert(key.to_string(), value.to_string());
        filter
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = InMemoryVectorStore::new();
        let id = store
            .insert("hello".into(), vec![1.0, 0.0], Metadata::new())
            .await
            .unwrap();
        let record = store.get(&id, &Filter::new()).await.unwrap().unwrap();
        assert_eq!(record.text, "hello");
    }

    #[tokio::test]
    async fn get_respects_filter() {
        let store = InMemoryVectorStore::new();
        let mut metadata = Metadata::new();
        metadata.insert("user_id".into(), "u1".into());
        let id = store
            .insert("hi".into(), vec![1.0], metadata)
            .await
            .unwrap();
        assert!(
            store
                .get(&id, &filter_with("user_id", "u2"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .get(&id, &filter_with("user_id", "u1"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn search_orders_by_similarity_descending() {
        let store = InMemoryVectorStore::new();
        store
            .insert("a".into(), vec![1.0, 0.0], Metadata::new())
            .await
            .unwrap();
        store
            .insert("b".into(), vec![0.0, 1.0], Metadata::new())
            .await
            .unwrap();
        let results = store
            .search(vec![1.0, 0.0], 2, &Filter::new())
            .await
            .unwrap();
        assert_eq!(results[0].record.text, "a");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn update_then_remove() {
        let store = InMemoryVectorStore::new();
        let id = store
            .insert("old".into(), vec![1.0], Metadata::new())
            .await
            .unwrap();
        store
            .update(&id, "new".into(), vec![2.0], Metadata::new(), &Filter::new())
            .await
            .unwrap();
        assert_eq!(
            store.get(&id, &Filter::new()).await.unwrap().unwrap().text,
            "new"
        );
        store.remove(&id, &Filter::new()).await.unwrap();
        assert!(store.get(&id, &Filter::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_missing_id_errors() {
        let store = InMemoryVectorStore::new();
        assert!(store.remove("missing", &Filter::new()).await.is_err());
    }

    #[tokio::test]
    async fn delete_by_scope_only_removes_matching_records() {
        let store = InMemoryVectorStore::new();
        let mut u1 = Metadata::new();
        u1.insert("user_id".into(), "u1".into());
        let mut u2 = Metadata::new();
        u2.insert("user_id".into(), "u2".into());
        let kept = store.insert("keep".into(), vec![1.0], u2).await.unwrap();
        store.insert("wipe".into(), vec![1.0], u1).await.unwrap();

        store.delete_by_scope(&filter_with("user_id", "u1")).await.unwrap();

        assert!(store.list(&filter_with("user_id", "u1")).await.unwrap().is_empty());
        assert!(store.get(&kept, &Filter::new()).await.unwrap().is_some());
    }

    #[test]
    fn bool_metadata_equals_string_form() {
        let value = memora_core::MetadataValue::Bool(true);
        assert!(super::metadata_matches(&value, "true"));
    }
}

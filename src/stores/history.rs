//! An in-process reference [`HistoryLog`] implementation.
//!
//! Append-only, per-fact sequence numbers assigned at append time so
//! readers can reconstruct a fact's evolution without relying on
//! timestamps.

use async_lock::Mutex;
use memora_core::ProviderError;
use memora_core::history::HistoryEntry;
use memora_core::history_log::HistoryLog;
use memora_core::scope::Filter;

/// An in-memory, append-only [`HistoryLog`].
#[derive(Debug, Default)]
pub struct InMemoryHistoryLog {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl InMemoryHistoryLog {
    /// Creates an empty history log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

fn scope_matches(entry: &HistoryEntry, filter: &Filter) -> bool {
    let scope_filter = entry.scope.filter();
    filter
        .iter()
        .all(|(key, value)| scope_filter.get(key) == Some(value))
}

impl HistoryLog for InMemoryHistoryLog {
    async fn append(&self, mut entry: HistoryEntry) -> Result<(), ProviderError> {
        let mut entries = self.entries.lock().await;
        let next_seq = entries
            .iter()
            .filter(|e| e.fact_id == entry.fact_id)
            .map(|e| e.seq)
            .max()
            .map_or(0, |max| max + 1);
        entry.seq = next_seq;
        entries.push(entry);
        Ok(())
    }

    async fn for_fact(
        &self,
        fact_id: &str,
        filter: &Filter,
    ) -> Result<Vec<HistoryEntry>, ProviderError> {
        let entries = self.entries.lock().await;
        let mut matched: Vec<HistoryEntry> = entries
            .iter()
            .filter(|entry| entry.fact_id == fact_id && scope_matches(entry, filter))
            .cloned()
            .collect();
        matched.sort_by_key(|entry| entry.seq);
        Ok(matched)
    }
}

impl InMemoryHistoryLog {
    /// Diagnostic accessor: total entry count across all facts/scopes.
    #[must_use]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if no entries have been appended.
    #[must_use]
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memora_core::Scope;
    use memora_core::history::ChangeKind;
    use time::OffsetDateTime;

    fn entry(fact_id: &str, kind: ChangeKind, scope: Scope) -> HistoryEntry {
        HistoryEntry {
            fact_id: fact_id.to_string(),
            seq: 0,
            prev_text: None,
            new_text: Some("x".into()),
            kind,
            scope,
            at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn sequence_numbers_increase_per_fact() {
        let log = InMemoryHistoryLog::new();
        let scope = Scope::for_user("u1").unwrap();
        log.append(entry("f1", ChangeKind::Add, scope.clone()))
            .await
            .unwrap();
        log.append(entry("f1", ChangeKind::Update, scope.clone()))
            .await
            .unwrap();
        log.append(entry("f2", ChangeKind::Add, scope.clone()))
            .await
            .unwrap();

        let history = log.for_fact("f1", &scope.filter()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].seq, 0);
        assert_eq!(history[1].seq, 1);
    }

    #[tokio::test]
    async fn history_is_scope_isolated() {
        let log = InMemoryHistoryLog::new();
        let u1 = Scope::for_user("u1").unwrap();
        let u2 = Scope::for_user("u2").unwrap();
        log.append(entry("f1", ChangeKind::Add, u1.clone()))
            .await
            .unwrap();
        assert!(log.for_fact("f1", &u2.filter()).await.unwrap().is_empty());
        assert_eq!(log.for_fact("f1", &u1.filter()).await.unwrap().len(), 1);
    }
}

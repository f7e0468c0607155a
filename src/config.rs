//! Typed, in-process orchestrator configuration.
//!
//! Loading configuration from disk or environment is left to callers; this
//! module only defines the in-process typed config surface — the knobs the
//! reconciliation, graph, and provider-timeout stages need.

use crate::retry::RetryPolicy;
use std::time::Duration;

/// Configures orchestrator behaviour.
///
/// Construct with [`OrchestratorConfig::default`] and override fields with
/// the `with_*` builder methods.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    reconciliation_neighbors: usize,
    graph_merge_threshold: f32,
    graph_merge_top_k: usize,
    bounded_pool_size: usize,
    llm_timeout: Duration,
    embedder_timeout: Duration,
    store_timeout: Duration,
    retry_policy: RetryPolicy,
    extraction_prompt: String,
    reconciliation_prompt: String,
    recency_window: usize,
    summary_refresh_interval: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            // Near-neighbour lookup during reconciliation: top 5 candidates
            // from the vector store, no similarity threshold.
            reconciliation_neighbors: 5,
            // Graph-entity soft-merge threshold/top-k: deliberately
            // permissive defaults, tunable per embedding model.
            graph_merge_threshold: 0.8,
            graph_merge_top_k: 5,
            bounded_pool_size: 8,
            llm_timeout: Duration::from_secs(30),
            embedder_timeout: Duration::from_secs(5),
            store_timeout: Duration::from_secs(5),
            retry_policy: RetryPolicy::default(),
            extraction_prompt: DEFAULT_EXTRACTION_PROMPT.to_string(),
            reconciliation_prompt: DEFAULT_RECONCILIATION_PROMPT.to_string(),
            // Extraction sees at most the last 20 messages directly; older
            // context only reaches it through the rolling summary, if one
            // is enabled.
            recency_window: 20,
            // Rolling conversation summary is opt-in: 0 disables it, so a
            // caller who never configures it pays no extra LLM call.
            summary_refresh_interval: 0,
        }
    }
}

impl OrchestratorConfig {
    /// Sets how many near-neighbours reconciliation retrieves per
    /// candidate fact.
    #[must_use]
    pub const fn with_reconciliation_neighbors(mut self, value: usize) -> Self {
        self.reconciliation_neighbors = value;
        self
    }

    /// Sets the minimum similarity score for the graph-entity soft-merge
    /// to reuse an existing entity instead of minting a new one.
    #[must_use]
    pub const fn with_graph_merge_threshold(mut self, value: f32) -> Self {
        self.graph_merge_threshold = value;
        self
    }

    /// Sets how many candidate entities the graph soft-merge considers
    /// per extracted entity.
    #[must_use]
    pub const fn with_graph_merge_top_k(mut self, value: usize) -> Self {
        self.graph_merge_top_k = value;
        self
    }

    /// Sets the bounded worker pool size used by the blocking facade and
    /// shared async backpressure semaphore.
    #[must_use]
    pub const fn with_bounded_pool_size(mut self, value: usize) -> Self {
        self.bounded_pool_size = value;
        self
    }

    /// Sets the per-call timeout for `LanguageModel` calls.
    #[must_use]
    pub const fn with_llm_timeout(mut self, value: Duration) -> Self {
        self.llm_timeout = value;
        self
    }

    /// Sets the per-call timeout for `EmbeddingModel` calls.
    #[must_use]
    pub const fn with_embedder_timeout(mut self, value: Duration) -> Self {
        self.embedder_timeout = value;
        self
    }

    /// Sets the per-call timeout for `VectorStore`/`GraphStore`/`HistoryLog`
    /// calls.
    #[must_use]
    pub const fn with_store_timeout(mut self, value: Duration) -> Self {
        self.store_timeout = value;
        self
    }

    /// Overrides the retry/backoff policy applied to transient provider
    /// failures.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Overrides the built-in fact-extraction prompt.
    #[must_use]
    pub fn with_extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.extraction_prompt = prompt.into();
        self
    }

    /// Overrides the built-in reconciliation prompt.
    #[must_use]
    pub fn with_reconciliation_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.reconciliation_prompt = prompt.into();
        self
    }

    /// Sets how many of the most recent messages extraction renders
    /// directly into its prompt. `0` means no limit (the full
    /// conversation is always rendered). Older context beyond the window
    /// only reaches extraction through the rolling summary, if enabled.
    #[must_use]
    pub const fn with_recency_window(mut self, value: usize) -> Self {
        self.recency_window = value;
        self
    }

    /// Sets how many ingested messages accumulate, per principal, before
    /// the rolling conversation summary is regenerated. `0` (the default)
    /// disables the summary entirely.
    #[must_use]
    pub const fn with_summary_refresh_interval(mut self, value: usize) -> Self {
        self.summary_refresh_interval = value;
        self
    }

    /// Returns the configured reconciliation neighbour count.
    #[must_use]
    pub const fn reconciliation_neighbors(&self) -> usize {
        self.reconciliation_neighbors
    }

    /// Returns the configured graph soft-merge similarity threshold.
    #[must_use]
    pub const fn graph_merge_threshold(&self) -> f32 {
        self.graph_merge_threshold
    }

    /// Returns the configured graph soft-merge candidate count.
    #[must_use]
    pub const fn graph_merge_top_k(&self) -> usize {
        self.graph_merge_top_k
    }

    /// Returns the configured bounded worker pool size.
    #[must_use]
    pub const fn bounded_pool_size(&self) -> usize {
        self.bounded_pool_size
    }

    /// Returns the configured `LanguageModel` call timeout.
    #[must_use]
    pub const fn llm_timeout(&self) -> Duration {
        self.llm_timeout
    }

    /// Returns the configured `EmbeddingModel` call timeout.
    #[must_use]
    pub const fn embedder_timeout(&self) -> Duration {
        self.embedder_timeout
    }

    /// Returns the configured store call timeout.
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Returns the active extraction prompt.
    #[must_use]
    pub fn extraction_prompt(&self) -> &str {
        &self.extraction_prompt
    }

    /// Returns the active reconciliation prompt.
    #[must_use]
    pub fn reconciliation_prompt(&self) -> &str {
        &self.reconciliation_prompt
    }

    /// Returns the configured recency window, in messages. `0` means
    /// unlimited.
    #[must_use]
    pub const fn recency_window(&self) -> usize {
        self.recency_window
    }

    /// Returns the configured summary refresh interval, in messages. `0`
    /// means the rolling summary is disabled.
    #[must_use]
    pub const fn summary_refresh_interval(&self) -> usize {
        self.summary_refresh_interval
    }
}

const DEFAULT_EXTRACTION_PROMPT: &str = "You are a precision memory extractor for a personal \
    assistant. Read the conversation and extract durable facts worth remembering long-term: \
    stable preferences, relationships, plans, and identifying details. Do not extract chit-chat, \
    small talk, or anything that is true only for the current turn. Return each fact as a short, \
    self-contained natural-language sentence.";

const DEFAULT_RECONCILIATION_PROMPT: &str = "You maintain a personal memory database. You will \
    be given a list of existing memories (with small integer ids) and a list of new candidate \
    facts. For each candidate, decide whether it should be ADDed as new memory, should UPDATE an \
    existing memory it extends or corrects, should DELETE an existing memory it contradicts, or \
    requires NO change because it is already captured. Reference existing memories only by the \
    integer id you were given.";

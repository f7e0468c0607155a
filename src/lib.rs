//! # memora
//!
//! A personalized long-term memory core for conversational agents.
//!
//! `memora` couples five pluggable providers — a [`LanguageModel`], an
//! [`EmbeddingModel`], a [`VectorStore`], a [`HistoryLog`], and an optional
//! [`GraphStore`] — behind one ingestion/retrieval pipeline: conversation
//! turns go in, durable facts come out, reconciled against everything the
//! caller already knows.
//!
//! ```text
//! IngestRequest ──▶ vision ──▶ extraction ──▶ reconciliation ──▶ persistence
//!                      │                                             │
//!                      └──────────────▶ graph_extraction ◀───────────┘
//! ```
//!
//! [`Memora`] is the facade that wires the stages together. Build one with
//! [`Memora::new`] (vector-only) or [`Memora::builder`] (to add a
//! [`GraphStore`], override [`OrchestratorConfig`], or plug in a
//! [`TelemetrySink`]). [`blocking::BlockingMemora`] wraps the same facade
//! for callers without a Tokio runtime of their own.

pub mod config;
pub mod error;
pub mod extraction;
pub mod graph_extraction;
pub mod persistence;
pub mod reconciliation;
pub mod retrieval;
pub mod retry;
pub mod stores;
pub mod telemetry;
#[cfg(test)]
pub(crate) mod testing;
pub(crate) mod summary;
pub mod types;
pub mod vision;

pub mod blocking;

use std::sync::Arc;

use memora_core::scope::{Filter, Scope};
use memora_core::{EmbeddingModel, GraphStore, HistoryLog, LanguageModel, VectorStore};

pub use config::OrchestratorConfig;
pub use error::{MemoryError, Result};
pub use stores::{InMemoryGraphStore, InMemoryHistoryLog, InMemoryVectorStore, NoopGraphStore};
pub use telemetry::{NoopSink, SharedSink, TelemetrySink};
pub use types::{
    ChangeEvent, Decision, IngestRequest, IngestResultItem, RelationResult, RetrievalQuery,
    RetrievalResponse, RetrievedFact,
};

use telemetry::{Outcome, Scope as TelemetryScope};

/// The memory orchestration facade.
///
/// Generic over the five provider traits so callers supply their own LLM,
/// embedder, and stores; `GS` defaults to [`NoopGraphStore`] so a
/// vector-only orchestrator never has to name a graph type it doesn't use.
/// The core itself holds no mutable state beyond the provider handles and
/// the telemetry sink's atomic counters — every call is independently
/// retriable and safe to run concurrently from multiple callers.
pub struct Memora<LLM, EMB, VS, HL, GS = NoopGraphStore> {
    llm: LLM,
    embedder: EMB,
    vector_store: VS,
    history_log: HL,
    graph_store: GS,
    graph_enabled: bool,
    config: OrchestratorConfig,
    telemetry: SharedSink,
    summaries: summary::ConversationSummaries,
}

impl<LLM, EMB, VS, HL, GS> std::fmt::Debug for Memora<LLM, EMB, VS, HL, GS> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memora")
            .field("graph_enabled", &self.graph_enabled)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<LLM, EMB, VS, HL> Memora<LLM, EMB, VS, HL, NoopGraphStore>
where
    LLM: LanguageModel,
    EMB: EmbeddingModel,
    VS: VectorStore,
    HL: HistoryLog,
{
    /// Builds a vector-only orchestrator with default configuration and no
    /// telemetry sink. Use [`Memora::builder`] to attach a [`GraphStore`]
    /// or override defaults.
    pub fn new(llm: LLM, embedder: EMB, vector_store: VS, history_log: HL) -> Self {
        Self {
            llm,
            embedder,
            vector_store,
            history_log,
            graph_store: NoopGraphStore,
            graph_enabled: false,
            config: OrchestratorConfig::default(),
            telemetry: Arc::new(NoopSink),
            summaries: summary::ConversationSummaries::new(),
        }
    }

    /// Starts a builder for custom configuration.
    pub fn builder(llm: LLM, embedder: EMB, vector_store: VS, history_log: HL) -> MemoraBuilder<LLM, EMB, VS, HL> {
        MemoraBuilder::new(llm, embedder, vector_store, history_log)
    }
}

impl<LLM, EMB, VS, HL, GS> Memora<LLM, EMB, VS, HL, GS> {
    pub(crate) fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}

impl<LLM, EMB, VS, HL, GS> Memora<LLM, EMB, VS, HL, GS>
where
    LLM: LanguageModel,
    EMB: EmbeddingModel,
    VS: VectorStore,
    HL: HistoryLog,
    GS: GraphStore,
{
    /// Ingests a batch of conversation messages.
    ///
    /// Runs vision resolution, then fans out into an independent vector
    /// path (extraction → reconciliation → persistence) and graph path
    /// (entity/relation extraction). The graph path never fails
    /// this call: its errors are swallowed and logged internally. A true
    /// early-cancellation of the graph branch on vector-path failure would
    /// require an owned, `'static` task (`tokio::spawn` over `Arc<Self>`);
    /// since graph failures are already fully isolated and a slow graph
    /// call cannot corrupt vector-layer state, this facade instead lets
    /// both branches run to completion and discards the graph branch's
    /// (unit) output when the vector branch errors.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Ingest`] if reconciliation fails after
    /// retries (`infer=true` only — `infer=false` never reconciles), or
    /// [`MemoryError::Provider`] if a provider call fails outside the
    /// retry-and-degrade paths the individual stages already apply.
    pub async fn add(&self, request: IngestRequest) -> Result<Vec<IngestResultItem>> {
        let mut scope = TelemetryScope::start(self.telemetry.as_ref(), "add");
        scope.uses("llm");
        scope.uses("embedder");
        scope.uses("vector_store");
        scope.uses("history_log");
        if self.graph_enabled {
            scope.uses("graph_store");
        }

        let outcome = self.add_inner(request).await;
        scope.finish(if outcome.is_ok() { Outcome::Success } else { Outcome::Failure });
        outcome
    }

    async fn add_inner(&self, request: IngestRequest) -> Result<Vec<IngestResultItem>> {
        let resolved = vision::resolve_images(
            &self.llm,
            &request.messages,
            self.config.retry_policy(),
            self.config.llm_timeout(),
        )
        .await;
        let transcript = extraction::render_transcript(&resolved);
        let principal = request.scope.principal().to_string();

        let candidates = if request.infer {
            let summary = self.summaries.refresh_if_due(&self.llm, &self.config, &principal, &resolved).await;
            extraction::extract(&self.llm, &self.config, &resolved, request.prompt_override.as_deref(), &summary).await
        } else {
            extraction::messages_as_candidates(&resolved)
        };

        let (vector_result, ()) = tokio::join!(
            self.run_vector_path(request.infer, candidates, &request.scope, &request.metadata),
            graph_extraction::extract_graph(
                &self.llm,
                &self.embedder,
                &self.graph_store,
                &self.config,
                &principal,
                &transcript,
                self.graph_enabled,
            ),
        );

        vector_result
    }

    async fn run_vector_path(
        &self,
        infer: bool,
        candidates: Vec<types::CandidateFact>,
        scope: &Scope,
        metadata: &memora_core::Metadata,
    ) -> Result<Vec<IngestResultItem>> {
        let decisions = if infer {
            reconciliation::reconcile(&self.llm, &self.embedder, &self.vector_store, &self.config, scope, &candidates)
                .await?
        } else {
            candidates.into_iter().map(|text| Decision::Add { text }).collect()
        };

        Ok(persistence::apply_decisions(
            &self.vector_store,
            &self.history_log,
            &self.embedder,
            &self.config,
            scope,
            metadata,
            decisions,
        )
        .await)
    }

    /// Runs a similarity search, optionally enriched with graph relations
    /// when a [`GraphStore`] is configured.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Provider`] on backend failure.
    pub async fn search(&self, query: &RetrievalQuery) -> Result<RetrievalResponse> {
        let mut scope = TelemetryScope::start(self.telemetry.as_ref(), "search");
        scope.uses("embedder");
        scope.uses("vector_store");
        if self.graph_enabled {
            scope.uses("graph_store");
        }
        let outcome =
            retrieval::retrieve(&self.embedder, &self.vector_store, &self.graph_store, &self.config, query, self.graph_enabled)
                .await;
        scope.finish(if outcome.is_ok() { Outcome::Success } else { Outcome::Failure });
        outcome
    }

    /// Fetches a single fact by id within `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::NotFound`] if no fact with `id` exists in
    /// this scope, or [`MemoryError::Provider`] on backend failure.
    pub async fn get(&self, scope: &Scope, id: &str) -> Result<RetrievedFact> {
        let mut t = TelemetryScope::start(self.telemetry.as_ref(), "get");
        t.uses("vector_store");
        let outcome = retrieval::get(&self.vector_store, &self.config, scope, id).await;
        t.finish(if outcome.is_ok() { Outcome::Success } else { Outcome::Failure });
        outcome
    }

    /// Lists every fact in `scope`, optionally narrowed by `filter` and
    /// capped at `limit` entries (`None` for unbounded).
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Provider`] on backend failure.
    pub async fn get_all(
        &self,
        scope: &Scope,
        filter: Option<&Filter>,
        limit: Option<usize>,
    ) -> Result<Vec<RetrievedFact>> {
        let mut t = TelemetryScope::start(self.telemetry.as_ref(), "get_all");
        t.uses("vector_store");
        let outcome = retrieval::get_all(&self.vector_store, &self.config, scope, filter, limit).await;
        t.finish(if outcome.is_ok() { Outcome::Success } else { Outcome::Failure });
        outcome
    }

    /// Returns the full change history for one fact.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Provider`] on backend failure.
    pub async fn history(&self, scope: &Scope, fact_id: &str) -> Result<Vec<memora_core::HistoryEntry>> {
        let mut t = TelemetryScope::start(self.telemetry.as_ref(), "history");
        t.uses("history_log");
        let outcome = retrieval::history(&self.history_log, &self.config, scope, fact_id).await;
        t.finish(if outcome.is_ok() { Outcome::Success } else { Outcome::Failure });
        outcome
    }

    /// Soft-deletes a single fact, appending a `Delete` history entry.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::NotFound`] if `id` does not exist in this
    /// scope, or [`MemoryError::Provider`] on backend failure.
    pub async fn delete(&self, scope: &Scope, id: &str) -> Result<()> {
        let mut t = TelemetryScope::start(self.telemetry.as_ref(), "delete");
        t.uses("vector_store");
        t.uses("history_log");
        let outcome = retrieval::delete(&self.vector_store, &self.history_log, &self.config, scope, id).await;
        t.finish(if outcome.is_ok() { Outcome::Success } else { Outcome::Failure });
        outcome
    }

    /// Removes every fact in `scope`. History is retained.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Provider`] if listing the scope's facts fails.
    pub async fn delete_all(&self, scope: &Scope) -> Result<()> {
        let mut t = TelemetryScope::start(self.telemetry.as_ref(), "delete_all");
        t.uses("vector_store");
        let outcome = retrieval::delete_all(&self.vector_store, &self.config, scope).await;
        t.finish(if outcome.is_ok() { Outcome::Success } else { Outcome::Failure });
        outcome
    }

    /// Wipes `scope`'s vector-store facts and the graph's `scope.principal()`
    /// partition. History is retained.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Provider`] if listing the scope's facts fails.
    pub async fn reset(&self, scope: &Scope) -> Result<()> {
        let mut t = TelemetryScope::start(self.telemetry.as_ref(), "reset");
        t.uses("vector_store");
        if self.graph_enabled {
            t.uses("graph_store");
        }
        let outcome = retrieval::reset(&self.vector_store, &self.graph_store, &self.config, scope).await;
        t.finish(if outcome.is_ok() { Outcome::Success } else { Outcome::Failure });
        outcome
    }
}

/// Builder for [`Memora`], using the conventional `builder()...build()`
/// pattern for incrementally configuring providers before construction.
pub struct MemoraBuilder<LLM, EMB, VS, HL, GS = NoopGraphStore> {
    llm: LLM,
    embedder: EMB,
    vector_store: VS,
    history_log: HL,
    graph_store: GS,
    graph_enabled: bool,
    config: OrchestratorConfig,
    telemetry: SharedSink,
    summaries: summary::ConversationSummaries,
}

impl<LLM, EMB, VS, HL, GS> std::fmt::Debug for MemoraBuilder<LLM, EMB, VS, HL, GS> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoraBuilder")
            .field("graph_enabled", &self.graph_enabled)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<LLM, EMB, VS, HL> MemoraBuilder<LLM, EMB, VS, HL, NoopGraphStore> {
    fn new(llm: LLM, embedder: EMB, vector_store: VS, history_log: HL) -> Self {
        Self {
            llm,
            embedder,
            vector_store,
            history_log,
            graph_store: NoopGraphStore,
            graph_enabled: false,
            config: OrchestratorConfig::default(),
            telemetry: Arc::new(NoopSink),
            summaries: summary::ConversationSummaries::new(),
        }
    }

    /// Attaches a [`GraphStore`], enabling the optional knowledge-graph
    /// layer for every subsequent ingest and search call.
    #[must_use]
    pub fn with_graph_store<GS2: GraphStore>(self, graph_store: GS2) -> MemoraBuilder<LLM, EMB, VS, HL, GS2> {
        MemoraBuilder {
            llm: self.llm,
            embedder: self.embedder,
            vector_store: self.vector_store,
            history_log: self.history_log,
            graph_store,
            graph_enabled: true,
            config: self.config,
            telemetry: self.telemetry,
            summaries: self.summaries,
        }
    }
}

impl<LLM, EMB, VS, HL, GS> MemoraBuilder<LLM, EMB, VS, HL, GS> {
    /// Overrides the default [`OrchestratorConfig`].
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a telemetry sink. Defaults to [`NoopSink`].
    #[must_use]
    pub fn with_telemetry(mut self, sink: SharedSink) -> Self {
        self.telemetry = sink;
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Memora<LLM, EMB, VS, HL, GS> {
        Memora {
            llm: self.llm,
            embedder: self.embedder,
            vector_store: self.vector_store,
            history_log: self.history_log,
            graph_store: self.graph_store,
            graph_enabled: self.graph_enabled,
            config: self.config,
            telemetry: self.telemetry,
            summaries: self.summaries,
        }
    }
}

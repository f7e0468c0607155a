//! A blocking adapter over [`Memora`].
//!
//! Tokio async is the one real concurrency model this core implements —
//! [`Memora`] itself. This module is a thin synchronous adapter: a
//! dedicated multi-thread runtime plus `block_on`, not a second pipeline.
//! Results are identical to driving the async facade to completion
//! directly.

use memora_core::scope::{Filter, Scope};
use memora_core::{EmbeddingModel, GraphStore, HistoryLog, LanguageModel, VectorStore};
use tokio::runtime::Runtime;

use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::stores::NoopGraphStore;
use crate::telemetry::SharedSink;
use crate::types::{IngestRequest, IngestResultItem, RetrievalQuery, RetrievalResponse, RetrievedFact};
use crate::{Memora, MemoraBuilder};

/// A synchronous facade over [`Memora`], for callers without a Tokio
/// runtime of their own. Every method blocks the calling thread until the
/// underlying async call completes.
pub struct BlockingMemora<LLM, EMB, VS, HL, GS = NoopGraphStore> {
    inner: Memora<LLM, EMB, VS, HL, GS>,
    runtime: Runtime,
}

impl<LLM, EMB, VS, HL, GS> std::fmt::Debug for BlockingMemora<LLM, EMB, VS, HL, GS> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingMemora").field("inner", &self.inner).finish()
    }
}

impl<LLM, EMB, VS, HL> BlockingMemora<LLM, EMB, VS, HL, NoopGraphStore>
where
    LLM: LanguageModel,
    EMB: EmbeddingModel,
    VS: VectorStore,
    HL: HistoryLog,
{
    /// Builds a vector-only blocking orchestrator backed by a dedicated
    /// runtime sized from `OrchestratorConfig::default()`'s bounded pool
    /// size.
    ///
    /// # Panics
    ///
    /// Panics if the dedicated Tokio runtime fails to start (e.g. no
    /// threads available) — an unrecoverable construction failure callers
    /// would have no real way to handle via a `Result`.
    #[must_use]
    pub fn new(llm: LLM, embedder: EMB, vector_store: VS, history_log: HL) -> Self {
        Self::from_memora(Memora::new(llm, embedder, vector_store, history_log))
    }

    /// Starts a builder for custom configuration, mirroring
    /// [`Memora::builder`].
    pub fn builder(
        llm: LLM,
        embedder: EMB,
        vector_store: VS,
        history_log: HL,
    ) -> BlockingMemoraBuilder<LLM, EMB, VS, HL> {
        BlockingMemoraBuilder {
            inner: MemoraBuilder::new(llm, embedder, vector_store, history_log),
        }
    }
}

impl<LLM, EMB, VS, HL, GS> BlockingMemora<LLM, EMB, VS, HL, GS>
where
    LLM: LanguageModel,
    EMB: EmbeddingModel,
    VS: VectorStore,
    HL: HistoryLog,
    GS: GraphStore,
{
    fn from_memora(inner: Memora<LLM, EMB, VS, HL, GS>) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(inner.config().bounded_pool_size().max(1))
            .enable_all()
            .build()
            .expect("failed to start the blocking orchestrator's Tokio runtime");
        Self { inner, runtime }
    }

    /// Blocking equivalent of [`Memora::add`].
    ///
    /// # Errors
    ///
    /// See [`Memora::add`].
    pub fn add(&self, request: IngestRequest) -> Result<Vec<IngestResultItem>> {
        self.runtime.block_on(self.inner.add(request))
    }

    /// Blocking equivalent of [`Memora::search`].
    ///
    /// # Errors
    ///
    /// See [`Memora::search`].
    pub fn search(&self, query: &RetrievalQuery) -> Result<RetrievalResponse> {
        self.runtime.block_on(self.inner.search(query))
    }

    /// Blocking equivalent of [`Memora::get`].
    ///
    /// # Errors
    ///
    /// See [`Memora::get`].
    pub fn get(&self, scope: &Scope, id: &str) -> Result<RetrievedFact> {
        self.runtime.block_on(self.inner.get(scope, id))
    }

    /// Blocking equivalent of [`Memora::get_all`].
    ///
    /// # Errors
    ///
    /// See [`Memora::get_all`].
    pub fn get_all(
        &self,
        scope: &Scope,
        filter: Option<&Filter>,
        limit: Option<usize>,
    ) -> Result<Vec<RetrievedFact>> {
        self.runtime.block_on(self.inner.get_all(scope, filter, limit))
    }

    /// Blocking equivalent of [`Memora::history`].
    ///
    /// # Errors
    ///
    /// See [`Memora::history`].
    pub fn history(&self, scope: &Scope, fact_id: &str) -> Result<Vec<memora_core::HistoryEntry>> {
        self.runtime.block_on(self.inner.history(scope, fact_id))
    }

    /// Blocking equivalent of [`Memora::delete`].
    ///
    /// # Errors
    ///
    /// See [`Memora::delete`].
    pub fn delete(&self, scope: &Scope, id: &str) -> Result<()> {
        self.runtime.block_on(self.inner.delete(scope, id))
    }

    /// Blocking equivalent of [`Memora::delete_all`].
    ///
    /// # Errors
    ///
    /// See [`Memora::delete_all`].
    pub fn delete_all(&self, scope: &Scope) -> Result<()> {
        self.runtime.block_on(self.inner.delete_all(scope))
    }

    /// Blocking equivalent of [`Memora::reset`].
    ///
    /// # Errors
    ///
    /// See [`Memora::reset`].
    pub fn reset(&self, scope: &Scope) -> Result<()> {
        self.runtime.block_on(self.inner.reset(scope))
    }
}

/// Builder for [`BlockingMemora`], mirroring [`MemoraBuilder`].
pub struct BlockingMemoraBuilder<LLM, EMB, VS, HL, GS = NoopGraphStore> {
    inner: MemoraBuilder<LLM, EMB, VS, HL, GS>,
}

impl<LLM, EMB, VS, HL, GS> std::fmt::Debug for BlockingMemoraBuilder<LLM, EMB, VS, HL, GS> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingMemoraBuilder").finish_non_exhaustive()
    }
}

impl<LLM, EMB, VS, HL> BlockingMemoraBuilder<LLM, EMB, VS, HL, NoopGraphStore> {
    /// Attaches a [`GraphStore`], mirroring [`MemoraBuilder::with_graph_store`].
    #[must_use]
    pub fn with_graph_store<GS2: GraphStore>(self, graph_store: GS2) -> BlockingMemoraBuilder<LLM, EMB, VS, HL, GS2> {
        BlockingMemoraBuilder {
            inner: self.inner.with_graph_store(graph_store),
        }
    }
}

impl<LLM, EMB, VS, HL, GS> BlockingMemoraBuilder<LLM, EMB, VS, HL, GS>
where
    LLM: LanguageModel,
    EMB: EmbeddingModel,
    VS: VectorStore,
    HL: HistoryLog,
    GS: GraphStore,
{
    /// Overrides the default [`OrchestratorConfig`].
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.inner = self.inner.with_config(config);
        self
    }

    /// Attaches a telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, sink: SharedSink) -> Self {
        self.inner = self.inner.with_telemetry(sink);
        self
    }

    /// Finishes the builder, starting the dedicated blocking runtime.
    #[must_use]
    pub fn build(self) -> BlockingMemora<LLM, EMB, VS, HL, GS> {
        BlockingMemora::from_memora(self.inner.build())
    }
}

//! # memora-core
//!
//! Provider trait abstractions that power the `memora` memory orchestration
//! core. An agent's long-term memory couples five independently-failing
//! subsystems — a language model, an embedder, a vector store, a graph
//! store, and a history log — behind one transactional contract. This
//! crate defines that contract and the shared data model; `memora`
//! implements the ingestion/retrieval pipeline and ships default
//! in-memory reference stores.
//!
//! ```text
//! ┌──────────────────┐    ┌───────────────────┐    ┌────────────────────┐
//! │  memora          │───▶│   memora-core     │◀───│    Providers       │
//! │  (orchestrator)  │    │   (this crate)     │    │                    │
//! │                  │    │                    │    │ - openai, gemini…  │
//! │ - extraction     │    │ - LanguageModel    │    │ - qdrant, pgvector │
//! │ - reconciliation │    │ - EmbeddingModel   │    │ - neo4j, in-memory │
//! │ - retrieval      │    │ - VectorStore      │    │                    │
//! └──────────────────┘    │ - GraphStore       │    └────────────────────┘
//!                         │ - HistoryLog        │
//!                         └────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`scope`] — the `(user, agent, session)` partition key every call operates within.
//! - [`fact`] — the persisted unit of memory and its metadata.
//! - [`history`] — append-only change log entries.
//! - [`graph`] — entities and relations for the optional knowledge-graph layer.
//! - [`error`] — the closed [`ProviderError`] taxonomy every provider call returns.
//! - [`message`] — conversation messages passed into extraction.
//! - [`llm`] — the [`LanguageModel`] trait and structured-output plumbing.
//! - [`embedding`] — the [`EmbeddingModel`] trait.
//! - [`vector_store`] — the [`VectorStore`] trait.
//! - [`graph_store`] — the [`GraphStore`] trait.
//! - [`history_log`] — the [`HistoryLog`] trait.

pub mod embedding;
pub mod error;
pub mod fact;
pub mod graph;
pub mod graph_store;
pub mod history;
pub mod history_log;
pub mod llm;
pub mod message;
pub mod scope;
pub mod vector_store;

#[doc(inline)]
pub use embedding::{EmbeddingModel, Purpose};
#[doc(inline)]
pub use error::{ErrorKind, ProviderError};
#[doc(inline)]
pub use fact::{Metadata, MetadataValue};
#[doc(inline)]
pub use graph::{Entity, Relation, RelationMatch};
#[doc(inline)]
pub use graph_store::GraphStore;
#[doc(inline)]
pub use history::{ChangeKind, HistoryEntry};
#[doc(inline)]
pub use history_log::HistoryLog;
#[doc(inline)]
pub use message::{Message, Role};
#[doc(inline)]
pub use scope::{InvalidScope, Scope};
#[doc(inline)]
pub use vector_store::{ScoredRecord, StoredRecord, VectorStore};

pub use llm::{LanguageModel, LlmRequest, oneshot};

/// Result type used throughout this crate's trait contracts.
pub type Result<T> = core::result::Result<T, ProviderError>;

//! Append-only history entries.
//!
//! A fact's history forms a total order via a per-fact monotonic sequence
//! number; readers reconstruct the full evolution without relying on
//! timestamps.

use crate::scope::Scope;
use time::OffsetDateTime;

/// The kind of change a [`HistoryEntry`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ChangeKind {
    /// A new fact was created.
    Add,
    /// An existing fact's payload was replaced.
    Update,
    /// A fact was soft-deleted.
    Delete,
}

/// An append-only record of one transition applied to a fact.
///
/// Never mutated or deleted once appended.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryEntry {
    /// Identifier of the fact this entry describes.
    pub fact_id: String,
    /// Monotonically increasing sequence number, scoped to `fact_id`.
    pub seq: u64,
    /// Payload before the change; `None` on `Add`.
    pub prev_text: Option<String>,
    /// Payload after the change; `None` on `Delete`.
    pub new_text: Option<String>,
    /// The kind of transition this entry records.
    pub kind: ChangeKind,
    /// Scope of the actor that caused this transition.
    pub scope: Scope,
    /// Wall-clock time the transition was applied.
    pub at: OffsetDateTime,
}

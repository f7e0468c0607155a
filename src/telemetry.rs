//! Opt-out usage counters with a pluggable sink.
//!
//! Every public call emits one fire-and-forget record. Sink failures are
//! swallowed — telemetry must never perturb the outcome of a real call.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Coarse outcome recorded for a telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The call completed successfully.
    Success,
    /// The call returned an error.
    Failure,
}

/// One `{op, provider_kinds, started_at, duration_ms, outcome}` record.
#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    /// The public operation name, e.g. `"add"`, `"search"`.
    pub op: &'static str,
    /// Provider kinds participating in this call, e.g. `["llm", "vector_store"]`.
    pub provider_kinds: Vec<&'static str>,
    /// Wall-clock duration of the call.
    pub duration_ms: u64,
    /// Whether the call succeeded.
    pub outcome: Outcome,
}

/// A sink that receives fire-and-forget telemetry events.
///
/// Implementations MUST NOT panic or block significantly; the core treats
/// sink failures as swallowed.
pub trait TelemetrySink: Send + Sync {
    /// Records one event. Must not fail observably to the caller.
    fn record(&self, event: TelemetryEvent);
}

/// A sink that discards every event. The default when no sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// An in-memory sink that counts events by `(op, outcome)`, useful in tests
/// and for opt-in local usage counters.
#[derive(Debug, Default)]
pub struct CountingSink {
    success: AtomicU64,
    failure: AtomicU64,
}

impl CountingSink {
    /// Creates an empty counting sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
        }
    }

    /// Returns the number of successful calls recorded so far.
    #[must_use]
    pub fn success_count(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    /// Returns the number of failed calls recorded so far.
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failure.load(Ordering::Relaxed)
    }
}

impl TelemetrySink for CountingSink {
    fn record(&self, event: TelemetryEvent) {
        match event.outcome {
            Outcome::Success => self.success.fetch_add(1, Ordering::Relaxed),
            Outcome::Failure => self.failure.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// Times a scoped operation and emits exactly one event to `sink` on drop
/// via [`Scope::finish`].
pub struct Scope<'a> {
    sink: &'a (dyn TelemetrySink),
    op: &'static str,
    provider_kinds: Vec<&'static str>,
    started: Instant,
}

impl<'a> Scope<'a> {
    /// Starts timing `op` against `sink`.
    pub fn start(sink: &'a dyn TelemetrySink, op: &'static str) -> Self {
        Self {
            sink,
            op,
            provider_kinds: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Records that `kind` participated in this call.
    pub fn uses(&mut self, kind: &'static str) {
        self.provider_kinds.push(kind);
    }

    /// Emits the event with the given outcome.
    pub fn finish(self, outcome: Outcome) {
        self.sink.record(TelemetryEvent {
            op: self.op,
            provider_kinds: self.provider_kinds,
            duration_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            outcome,
        });
    }
}

/// A shared handle to a configured telemetry sink.
pub type SharedSink = Arc<dyn TelemetrySink>;

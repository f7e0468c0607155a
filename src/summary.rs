//! Rolling conversation summary: an optional, config-gated enrichment that
//! keeps a running LLM-written digest of each principal's conversation,
//! refreshed every `summary_refresh_interval` ingested messages and fed
//! into the extraction prompt alongside the recency-windowed backlog
//! extraction can't see in full on its own.
//!
//! Disabled by default (`summary_refresh_interval` is `0`), so a caller who
//! never configures it never pays for the extra LLM call.

use crate::config::OrchestratorConfig;
use crate::extraction::render_transcript;
use crate::retry::retry_with_timeout;
use memora_core::llm::oneshot;
use memora_core::message::Message;
use memora_core::LanguageModel;
use std::collections::HashMap;

const SUMMARY_PROMPT: &str = "Summarize the durable context of this conversation in 2-3 \
    sentences: who the participants are, their stated preferences, plans, and relationships. \
    Omit small talk and anything true only for a single turn. Write plain prose, no headers or \
    bullet points.";

#[derive(Debug, Clone, Default)]
struct SummaryState {
    text: String,
    pending_messages: usize,
}

/// Per-principal rolling summaries, held by [`crate::Memora`] for the
/// lifetime of the orchestrator.
#[derive(Debug, Default)]
pub(crate) struct ConversationSummaries {
    state: async_lock::Mutex<HashMap<String, SummaryState>>,
}

impl ConversationSummaries {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Accounts for `messages` having just been ingested for `principal`.
    /// Once `summary_refresh_interval` messages have accumulated since the
    /// last refresh, regenerates the summary with one `llm` call folding in
    /// the new messages. Returns the summary text to use for this ingest
    /// call — freshly regenerated if a refresh just happened, otherwise
    /// whatever was already stored. Disabled (`summary_refresh_interval ==
    /// 0`) or failed refreshes return the prior text, empty if there has
    /// never been one.
    pub(crate) async fn refresh_if_due(
        &self,
        llm: &impl LanguageModel,
        config: &OrchestratorConfig,
        principal: &str,
        messages: &[Message],
    ) -> String {
        let interval = config.summary_refresh_interval();
        if interval == 0 || messages.is_empty() {
            return self.state.lock().await.get(principal).map_or_else(String::new, |s| s.text.clone());
        }

        let (previous, due) = {
            let mut guard = self.state.lock().await;
            let entry = guard.entry(principal.to_string()).or_default();
            entry.pending_messages += messages.len();
            (entry.text.clone(), entry.pending_messages >= interval)
        };
        if !due {
            return previous;
        }

        let transcript = render_transcript(messages);
        let prompt = if previous.is_empty() {
            format!("Conversation so far:\n{transcript}")
        } else {
            format!("Existing summary:\n{previous}\n\nNew messages since then:\n{transcript}")
        };
        let request = oneshot(SUMMARY_PROMPT, prompt);

        let result =
            retry_with_timeout(config.retry_policy(), config.llm_timeout(), || llm.complete(request.clone())).await;

        let mut guard = self.state.lock().await;
        let entry = guard.entry(principal.to_string()).or_default();
        entry.pending_messages = 0;
        match result {
            Ok(summary) if !summary.trim().is_empty() => entry.text = summary.trim().to_string(),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, principal, "rolling summary refresh failed, keeping previous summary");
            }
        }
        entry.text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NeverCalledLlm, ScriptedLlm};

    #[tokio::test]
    async fn disabled_by_default_never_calls_the_model() {
        let summaries = ConversationSummaries::new();
        let llm = NeverCalledLlm;
        let config = OrchestratorConfig::default();
        let messages = vec![Message::user("hi")];
        let summary = summaries.refresh_if_due(&llm, &config, "u1", &messages).await;
        assert!(summary.is_empty());
    }

    #[tokio::test]
    async fn refreshes_once_the_interval_is_reached() {
        let summaries = ConversationSummaries::new();
        let llm = ScriptedLlm::always("Alice likes hiking and lives in Denver.");
        let config = OrchestratorConfig::default().with_summary_refresh_interval(2);
        let messages = vec![Message::user("a"), Message::user("b")];
        let summary = summaries.refresh_if_due(&llm, &config, "u1", &messages).await;
        assert_eq!(summary, "Alice likes hiking and lives in Denver.");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn does_not_refresh_before_the_interval_is_reached() {
        let summaries = ConversationSummaries::new();
        let llm = NeverCalledLlm;
        let config = OrchestratorConfig::default().with_summary_refresh_interval(5);
        let messages = vec![Message::user("a")];
        let summary = summaries.refresh_if_due(&llm, &config, "u1", &messages).await;
        assert!(summary.is_empty());
    }

    #[tokio::test]
    async fn accumulates_pending_messages_across_calls() {
        let summaries = ConversationSummaries::new();
        let llm = ScriptedLlm::always("Summary text.");
        let config = OrchestratorConfig::default().with_summary_refresh_interval(3);

        let first = summaries.refresh_if_due(&llm, &config, "u1", &[Message::user("a")]).await;
        assert!(first.is_empty());
        assert_eq!(llm.call_count(), 0);

        let second = summaries.refresh_if_due(&llm, &config, "u1", &[Message::user("b"), Message::user("c")]).await;
        assert_eq!(second, "Summary text.");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_previous_summary() {
        let summaries = ConversationSummaries::new();
        let config = OrchestratorConfig::default().with_summary_refresh_interval(1);

        let seeded = summaries
            .refresh_if_due(&ScriptedLlm::always("first summary"), &config, "u1", &[Message::user("a")])
            .await;
        assert_eq!(seeded, "first summary");

        let after_failure = summaries.refresh_if_due(&NeverCalledLlm, &config, "u1", &[Message::user("b")]).await;
        assert_eq!(after_failure, "first summary");
    }
}

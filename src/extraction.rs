//! Extraction Stage: turns conversation messages into a set of
//! candidate fact strings.
//!
//! Extraction is best-effort: any LLM failure surviving the one repair
//! attempt `LanguageModel::generate` already performs degrades to an empty
//! candidate set rather than aborting the ingest call.

use crate::config::OrchestratorConfig;
use crate::retry::retry_with_timeout;
use crate::types::{CandidateFact, ExtractionBatch};
use memora_core::llm::oneshot;
use memora_core::message::Message;
use memora_core::LanguageModel;

/// Extracts candidate facts from `messages`.
///
/// `prompt_override`, when set, replaces the built-in extraction prompt for
/// this call. `summary`, when non-empty, is the rolling conversation
/// summary prepended ahead of the recency-windowed transcript, so
/// extraction retains context from exchanges the window has scrolled past.
///
/// Candidates are trimmed and deduplicated by exact string match within the
/// batch. An empty result is a legal outcome, not an error.
pub async fn extract(
    llm: &impl LanguageModel,
    config: &OrchestratorConfig,
    messages: &[Message],
    prompt_override: Option<&str>,
    summary: &str,
) -> Vec<CandidateFact> {
    if messages.is_empty() {
        return Vec::new();
    }

    let system_prompt = prompt_override.unwrap_or_else(|| config.extraction_prompt());
    let windowed = recency_windowed(messages, config.recency_window());
    let transcript = render_transcript(windowed);
    let transcript = if summary.is_empty() {
        transcript
    } else {
        format!("Summary of earlier conversation:\n{summary}\n\nRecent messages:\n{transcript}")
    };
    let request = oneshot(system_prompt, transcript);

    let result = retry_with_timeout(config.retry_policy(), config.llm_timeout(), || llm.generate(request.clone()))
        .await;

    let batch: ExtractionBatch = match result {
        Ok(batch) => batch,
        Err(err) => {
            tracing::warn!(error = %err, "fact extraction failed after retries; yielding no candidates");
            return Vec::new();
        }
    };

    dedupe_trimmed(batch.facts)
}

/// Bypasses extraction entirely: each message's text becomes a candidate
/// fact as-is. Empty/blank messages are dropped.
#[must_use]
pub fn messages_as_candidates(messages: &[Message]) -> Vec<CandidateFact> {
    dedupe_trimmed(messages.iter().map(|m| m.content().to_string()).collect())
}

fn dedupe_trimmed(facts: Vec<String>) -> Vec<CandidateFact> {
    let mut seen = std::collections::HashSet::new();
    let mut deduped = Vec::new();
    for fact in facts {
        let trimmed = fact.trim().to_string();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.clone()) {
            deduped.push(trimmed);
        }
    }
    deduped
}

/// Returns the last `window` messages, or all of `messages` when `window`
/// is `0` (unlimited).
fn recency_windowed(messages: &[Message], window: usize) -> &[Message] {
    if window == 0 || messages.len() <= window {
        messages
    } else {
        &messages[messages.len() - window..]
    }
}

pub(crate) fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| format!("{:?}: {}", message.role(), message.content()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlakyLlm, NeverCalledLlm, ScriptedLlm};

    #[tokio::test]
    async fn empty_messages_yield_no_candidates_and_no_call() {
        let llm = NeverCalledLlm;
        let config = OrchestratorConfig::default();
        let candidates = extract(&llm, &config, &[], None, "").await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn extracts_and_dedupes_facts() {
        let llm = ScriptedLlm::always(r#"{"facts":["User loves pizza","User loves pizza","  "]}"#);
        let config = OrchestratorConfig::default();
        let messages = vec![Message::user("I love pizza")];
        let candidates = extract(&llm, &config, &messages, None, "").await;
        assert_eq!(candidates, vec!["User loves pizza".to_string()]);
    }

    #[tokio::test]
    async fn malformed_output_degrades_to_empty_after_repair_fails() {
        let llm = ScriptedLlm::always("not json at all, still not json");
        let config = OrchestratorConfig::default();
        let messages = vec![Message::user("hi")];
        let candidates = extract(&llm, &config, &messages, None, "").await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn transient_failures_are_retried_before_success() {
        let llm = FlakyLlm::new(2, r#"{"facts":["recovered fact"]}"#);
        let config = OrchestratorConfig::default();
        let messages = vec![Message::user("hi")];
        let candidates = extract(&llm, &config, &messages, None, "").await;
        assert_eq!(candidates, vec!["recovered fact".to_string()]);
    }

    #[tokio::test]
    async fn recency_window_limits_the_rendered_transcript() {
        let llm = crate::testing::RecordingLlm::new(ScriptedLlm::always(r#"{"facts":[]}"#));
        let config = OrchestratorConfig::default().with_recency_window(1);
        let messages = vec![Message::user("old message"), Message::user("new message")];
        extract(&llm, &config, &messages, None, "").await;

        let requests = llm.requests().await;
        let transcript = requests[0].messages()[1].content();
        assert!(transcript.contains("new message"));
        assert!(!transcript.contains("old message"));
    }

    #[tokio::test]
    async fn non_empty_summary_is_prepended_ahead_of_the_transcript() {
        let llm = crate::testing::RecordingLlm::new(ScriptedLlm::always(r#"{"facts":[]}"#));
        let config = OrchestratorConfig::default();
        let messages = vec![Message::user("hi")];
        extract(&llm, &config, &messages, None, "Alice likes pizza.").await;

        let requests = llm.requests().await;
        let transcript = requests[0].messages()[1].content();
        assert!(transcript.starts_with("Summary of earlier conversation:\nAlice likes pizza."));
    }

    #[test]
    fn infer_false_maps_each_message_to_a_candidate() {
        let messages = vec![Message::user("a"), Message::user("b")];
        let candidates = messages_as_candidates(&messages);
        assert_eq!(candidates, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn infer_false_drops_blank_messages() {
        let messages = vec![Message::user("  "), Message::user("b")];
        let candidates = messages_as_candidates(&messages);
        assert_eq!(candidates, vec!["b".to_string()]);
    }
}

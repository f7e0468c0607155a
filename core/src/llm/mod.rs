//! Structured, non-streaming access to a language model.
//!
//! The orchestrator never streams and never asks a model to call tools —
//! every call it makes wants one typed JSON value back (a fact list, a
//! reconciliation decision, an entity/relation batch). This module provides
//! JSON-repair plumbing (`parse_json_with_recovery` and friends) around a
//! single request shape, with one explicit repair round: if the first reply
//! doesn't parse, the model gets one more try with the parse error attached;
//! if that also fails the call returns a [`ProviderError::malformed`] error.

mod prompts;

use crate::ProviderError;
use crate::message::Message;
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use std::any::TypeId;
use std::future::Future;

/// A request for a single, non-streaming, typed response from a model.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    messages: Vec<Message>,
}

impl LlmRequest {
    /// Creates a request from the given conversation messages.
    pub fn new(messages: impl Into<Vec<Message>>) -> Self {
        Self {
            messages: messages.into(),
        }
    }

    /// Returns the conversation messages.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Appends a message to the request, returning the updated request.
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}

/// Convenience helper that builds a single system + user [`LlmRequest`].
pub fn oneshot(system: impl Into<String>, user: impl Into<String>) -> LlmRequest {
    LlmRequest::new(vec![Message::system(system), Message::user(user)])
}

/// A language model that produces one typed JSON value per call.
///
/// No streaming, no tool calling: every caller in this crate wants a
/// schema-conformant value back, not a token stream to narrate.
pub trait LanguageModel: Send + Sync {
    /// Sends `request` to the model and returns its raw text reply.
    ///
    /// Implementors should make exactly one upstream call per invocation;
    /// retries belong to the orchestrator's retry policy, not here.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on network, auth, or upstream failure.
    fn complete(
        &self,
        request: LlmRequest,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;

    /// Generates a value of `T` conforming to `T`'s JSON schema.
    ///
    /// Appends a schema-following instruction to the request, sends it,
    /// and parses the reply. If the reply doesn't parse, asks once more
    /// with the parse failure attached before giving up.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the underlying call fails, or
    /// [`ProviderError::malformed`] if both attempts produce output that
    /// doesn't conform to `T`'s schema.
    fn generate<T: JsonSchema + DeserializeOwned + Send + 'static>(
        &self,
        request: LlmRequest,
    ) -> impl Future<Output = Result<T, ProviderError>> + Send {
        structured_generate(self, request)
    }
}

async fn structured_generate<T, M>(model: &M, mut request: LlmRequest) -> Result<T, ProviderError>
where
    T: JsonSchema + DeserializeOwned + Send + 'static,
    M: LanguageModel + ?Sized,
{
    let schema = schema_for!(T);
    let schema_text =
        serde_json::to_string_pretty(&schema).map_err(|err| ProviderError::permanent(err))?;

    if !is_string_type::<T>() {
        let prompt = prompts::generate(&schema_text);
        request.messages.push(Message::system(prompt));
    }

    let first_reply = model.complete(request.clone()).await?;
    match parse_json_with_recovery::<T>(&first_reply) {
        Ok(value) => return Ok(value),
        Err(first_err) => {
            let repair = request.with_message(Message::assistant(first_reply)).with_message(
                Message::system(format!(
                    "That reply did not parse as the requested JSON schema: {first_err}. \
                     Reply again with ONLY corrected JSON, no commentary."
                )),
            );
            let second_reply = model.complete(repair).await?;
            parse_json_with_recovery::<T>(&second_reply)
                .map_err(|err| ProviderError::malformed(err).promote_to_permanent())
        }
    }
}

fn parse_json_with_recovery<T: DeserializeOwned + 'static>(
    json: &str,
) -> Result<T, anyhow::Error> {
    let trimmed = json.trim();
    let mut last_error: Option<serde_json::Error> = None;
    let mut last_candidate: Option<String> = None;

    for candidate in build_json_candidates(trimmed) {
        match serde_json::from_str::<T>(&candidate) {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_error = Some(err);
                last_candidate = Some(candidate);
            }
        }
    }

    if is_string_type::<T>() {
        if let Some(candidate) = last_candidate.clone() {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&candidate) {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                let encoded = serde_json::to_string(&text)?;
                if let Ok(value) = serde_json::from_str::<T>(&encoded) {
                    return Ok(value);
                }
            }
        }
    }

    let primary = last_error.map_or_else(
        || anyhow::anyhow!("structured output was empty or missing JSON block"),
        anyhow::Error::new,
    );
    let snippet = last_candidate
        .as_deref()
        .unwrap_or(trimmed)
        .chars()
        .take(500)
        .collect::<String>();
    Err(primary.context(format!("failed to parse structured output; sample: {snippet}")))
}

fn strip_code_fences(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let fence_start = trimmed.find("```")?;
    let after_fence = &trimmed[fence_start + 3..];
    let mut lines = after_fence.lines();
    let _maybe_lang = lines.next();
    let body = lines.collect::<Vec<_>>().join("\n");
    let content = body.rfind("```").map_or(body.as_str(), |end| &body[..end]);

    let cleaned = content.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn extract_json_block(raw: &str) -> Option<String> {
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if end >= start {
            let candidate = &raw[start..=end];
            if !candidate.trim().is_empty() {
                return Some(candidate.trim().to_string());
            }
        }
    }
    if let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) {
        if end >= start {
            let candidate = &raw[start..=end];
            if !candidate.trim().is_empty() {
                return Some(candidate.trim().to_string());
            }
        }
    }
    None
}

fn build_json_candidates(raw: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    if !raw.is_empty() {
        candidates.push(raw.to_string());
    }
    if let Some(fenced) = strip_code_fences(raw) {
        candidates.push(fenced);
    }
    if let Some(block) = extract_json_block(raw) {
        candidates.push(block);
    }
    if let Some(dequoted) = dequote_json_string(raw) {
        candidates.push(dequoted);
    }
    if let Some(stripped) = strip_leading_label(raw, "json") {
        candidates.push(stripped);
    }

    let mut deduped = Vec::new();
    for candidate in candidates {
        if deduped.iter().all(|seen| seen != &candidate) {
            deduped.push(candidate);
        }
    }
    deduped
}

fn dequote_json_string(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('"') && trimmed.ends_with('"')) {
        return None;
    }
    let inner: String = serde_json::from_str(trimmed).ok()?;
    if inner.trim().is_empty() {
        None
    } else {
        Some(inner)
    }
}

fn strip_leading_label(raw: &str, label: &str) -> Option<String> {
    let trimmed = raw.trim_start();
    if !trimmed.to_ascii_lowercase().starts_with(label) {
        return None;
    }
    let stripped = trimmed[label.len()..]
        .trim_start_matches(|c: char| c.is_whitespace() || c == ':' || c == '-')
        .trim();
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

fn is_string_type<T: 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<String>()
}

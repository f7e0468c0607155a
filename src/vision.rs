//! Vision Input Adapter: resolves image
//! attachments on `User` messages to textual descriptions before
//! extraction ever sees the conversation.
//!
//! Runs as its own concurrent branch during ingest, so a slow or failing
//! image description never blocks the vector or graph branches from
//! starting.

use crate::retry::{RetryPolicy, retry_with_timeout};
use futures::future::join_all;
use memora_core::llm::oneshot;
use memora_core::message::Message;
use memora_core::{LanguageModel, ProviderError};
use std::time::Duration;

/// Resolves every attachment on every `User` message in `messages` to a
/// textual description, appending the descriptions to the message content.
/// Messages without attachments pass through unchanged.
///
/// A failed resolution degrades to dropping that one reference with a
/// logged warning — it never fails the whole call. Each underlying call is
/// guarded by `timeout`, the same as any other LLM call.
pub async fn resolve_images(
    llm: &impl LanguageModel,
    messages: &[Message],
    policy: RetryPolicy,
    timeout: Duration,
) -> Vec<Message> {
    let futures = messages
        .iter()
        .map(|message| resolve_one(llm, message, policy, timeout));
    join_all(futures).await
}

async fn resolve_one(llm: &impl LanguageModel, message: &Message, policy: RetryPolicy, timeout: Duration) -> Message {
    if message.attachments().is_empty() {
        return message.clone();
    }

    let descriptions = join_all(
        message
            .attachments()
            .iter()
            .map(|url| describe_image(llm, url, policy, timeout)),
    )
    .await;

    let mut content = message.content().to_string();
    for description in descriptions.into_iter().flatten() {
        content.push_str("\n[image: ");
        content.push_str(&description);
        content.push(']');
    }

    Message::User {
        content,
        attachments: Vec::new(),
    }
}

async fn describe_image(
    llm: &impl LanguageModel,
    url: &url::Url,
    policy: RetryPolicy,
    timeout: Duration,
) -> Option<String> {
    let request = oneshot(
        "Describe the image at the given URL in one concise sentence, focused on durable \
         facts (people, objects, places, text visible in the image) rather than aesthetics.",
        url.to_string(),
    );

    let result: Result<String, ProviderError> =
        retry_with_timeout(policy, timeout, || llm.complete(request.clone())).await;

    match result {
        Ok(description) if !description.trim().is_empty() => Some(description.trim().to_string()),
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "failed to resolve image attachment, dropping reference");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    #[tokio::test]
    async fn messages_without_attachments_pass_through() {
        let llm = ScriptedLlm::always("unused");
        let messages = vec![Message::user("hello")];
        let resolved = resolve_images(&llm, &messages, RetryPolicy::default(), Duration::from_secs(5)).await;
        assert_eq!(resolved, messages);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn attachment_description_is_appended_to_content() {
        let llm = ScriptedLlm::always("a red bicycle leaning on a wall");
        let url = "https://example.com/bike.png".parse().unwrap();
        let message = Message::user("what is this?").with_attachment(url);
        let resolved = resolve_images(
            &llm,
            std::slice::from_ref(&message),
            RetryPolicy::default(),
            Duration::from_secs(5),
        )
        .await;
        assert!(resolved[0].content().contains("red bicycle"));
        assert!(resolved[0].attachments().is_empty());
    }

    struct AlwaysFailLlm;
    impl LanguageModel for AlwaysFailLlm {
        async fn complete(
            &self,
            _request: memora_core::llm::LlmRequest,
        ) -> Result<String, ProviderError> {
            Err(ProviderError::permanent(anyhow::anyhow!("vision unavailable")))
        }
    }

    #[tokio::test]
    async fn failed_resolution_degrades_to_dropped_reference() {
        let llm = AlwaysFailLlm;
        let url = "https://example.com/bike.png".parse().unwrap();
        let message = Message::user("what is this?").with_attachment(url);
        let resolved = resolve_images(
            &llm,
            std::slice::from_ref(&message),
            RetryPolicy::default(),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(resolved[0].content(), "what is this?");
    }
}

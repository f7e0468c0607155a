//! Conversation messages passed into the extraction stage.
//!
//! Messages are an enum with variants for each role. User messages may carry attachment URLs;
//! the Vision Input Adapter resolves these to textual descriptions before
//! extraction sees the conversation.

use url::Url;

/// Conversation participant role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Role {
    /// Input from the human (or calling agent) side of the conversation.
    User,
    /// A prior response from the assistant.
    Assistant,
    /// Instructions/context for the conversation, or (when the caller
    /// opts in) a fact-extraction prompt override.
    System,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "role", rename_all = "snake_case"))]
pub enum Message {
    /// User message with content and optional attachments.
    User {
        /// Text content of the message.
        content: String,
        /// Attachment URLs (typically images) resolved by the Vision
        /// Input Adapter before extraction.
        #[cfg_attr(
            feature = "serde",
            serde(default, skip_serializing_if = "Vec::is_empty")
        )]
        attachments: Vec<Url>,
    },
    /// Assistant message with content.
    Assistant {
        /// Text content of the message.
        content: String,
    },
    /// System message with instructions/context.
    System {
        /// Text content of the message.
        content: String,
    },
}

impl Message {
    /// Returns the message sender role.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::System { .. } => Role::System,
        }
    }

    /// Returns the text content of the message.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::User { content, .. } | Self::Assistant { content } | Self::System { content } => {
                content
            }
        }
    }

    /// Returns the attachment URLs (only ever non-empty for `User` messages).
    #[must_use]
    pub fn attachments(&self) -> &[Url] {
        match self {
            Self::User { attachments, .. } => attachments,
            Self::Assistant { .. } | Self::System { .. } => &[],
        }
    }

    /// Creates a new user message with no attachments.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    /// Creates a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
        }
    }

    /// Creates a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Adds an attachment URL to the message. A no-op on `Assistant`/`System`
    /// messages, which carry no attachments.
    #[must_use]
    pub fn with_attachment(mut self, url: Url) -> Self {
        if let Self::User { attachments, .. } = &mut self {
            attachments.push(url);
        }
        self
    }

    /// Adds multiple attachment URLs to the message.
    #[must_use]
    pub fn with_attachments(mut self, urls: impl IntoIterator<Item = Url>) -> Self {
        if let Self::User { attachments, .. } = &mut self {
            attachments.extend(urls);
        }
        self
    }
}

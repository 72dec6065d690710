//! Chat-completion provider abstraction and failure classification.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a message sent to the provider.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instruction context.
    System,
    /// Human speaker.
    User,
    /// Model speaker.
    Assistant,
}

/// One message of a chat request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a message.
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A complete chat request for one model.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Ordered messages, instruction first.
    pub messages: Vec<ChatMessage>,
    /// Response length cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Non-streaming provider output.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChatCompletion {
    /// Candidate texts in provider order; `None` when a candidate carried no text.
    pub candidates: Vec<Option<String>>,
}

impl ChatCompletion {
    /// Text of the first candidate, if it is present and non-empty.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(Option::as_deref)
            .filter(|text| !text.is_empty())
    }
}

/// Provider error type.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success HTTP status.
    #[error("provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
    /// HTTP client error (connect, TLS, body read).
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    /// The connection dropped or an event stream broke mid-way.
    #[error("connection error: {0}")]
    Connection(String),
    /// The provider reported an error inside a stream.
    #[error("provider stream error: {0}")]
    Stream(String),
    /// A response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Convenience result alias for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Incremental text fragments, in arrival order.
pub type FragmentStream = BoxStream<'static, ProviderResult<String>>;

/// How a provider failure should be handled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureClass {
    /// Credential or model is invalid, forbidden or missing. Another model may work.
    Access,
    /// Anything else; another model would most likely fail the same way.
    Other,
}

/// Classify a provider failure.
#[must_use]
pub const fn classify(error: &ProviderError) -> FailureClass {
    match error {
        ProviderError::Status { status, .. } if is_access_status(*status) => FailureClass::Access,
        _ => FailureClass::Other,
    }
}

/// Unauthorized, forbidden and not-found statuses.
#[must_use]
pub const fn is_access_status(status: u16) -> bool {
    matches!(status, 401 | 403 | 404)
}

/// Trait that chat-completion backends implement.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    /// Produce a complete response.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be decoded.
    async fn complete(&self, request: &ChatRequest) -> ProviderResult<ChatCompletion>;

    /// Open an incremental response.
    ///
    /// # Errors
    /// Returns an error if the stream cannot be opened; later failures arrive
    /// as items of the stream.
    async fn stream(&self, request: &ChatRequest) -> ProviderResult<FragmentStream>;
}

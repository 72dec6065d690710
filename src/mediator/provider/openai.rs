//! OpenAI-compatible chat-completion provider.
//!
//! Behaviour:
//! - `POST {base_url}/chat/completions` with a bearer credential.
//! - Non-success statuses become [`ProviderError::Status`] so the caller can
//!   classify them.
//! - Streaming reads server-sent events until the `[DONE]` sentinel.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{StreamExt, future};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::config::MediatorConfig;
use crate::mediator::provider::chat_provider::{
    ChatCompletion, ChatMessage, ChatProvider, ChatRequest, FragmentStream, ProviderError,
    ProviderResult,
};

/// Sentinel event data closing a stream.
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

impl<'a> CompletionBody<'a> {
    fn new(request: &'a ChatRequest, stream: bool) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<StreamErrorBody>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct StreamErrorBody {
    message: Option<String>,
}

/// Provider talking to an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
    /// Build a provider from configuration.
    ///
    /// No overall request timeout is set; callers bound each exchange themselves.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &MediatorConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn post(&self, request: &ChatRequest, stream: bool) -> ProviderResult<reqwest::Response> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            stream,
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&CompletionBody::new(request, stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    debug!(status = status.as_u16(), error = %err, "Could not read error body");
                    String::new()
                }
            };
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> ProviderResult<ChatCompletion> {
        let response = self.post(request, false).await?;
        let bytes = response.bytes().await?;
        parse_completion(&bytes)
    }

    async fn stream(&self, request: &ChatRequest) -> ProviderResult<FragmentStream> {
        let response = self.post(request, true).await?;
        let fragments = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| {
                future::ready(!matches!(event, Ok(event) if event.data == DONE_SENTINEL))
            })
            .filter_map(|event| {
                future::ready(match event {
                    Ok(event) => parse_stream_chunk(&event.data).transpose(),
                    Err(err) => Some(Err(ProviderError::Connection(err.to_string()))),
                })
            })
            .boxed();
        Ok(fragments)
    }
}

fn parse_completion(bytes: &[u8]) -> ProviderResult<ChatCompletion> {
    let response: CompletionResponse = serde_json::from_slice(bytes)?;
    let candidates = response
        .choices
        .into_iter()
        .map(|choice| choice.message.and_then(|message| message.content))
        .collect();
    Ok(ChatCompletion { candidates })
}

/// Decode one SSE data payload into the text it carries, if any.
fn parse_stream_chunk(data: &str) -> ProviderResult<Option<String>> {
    let chunk: StreamChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        return Err(ProviderError::Stream(
            error
                .message
                .unwrap_or_else(|| "stream reported an error".to_string()),
        ));
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content))
}

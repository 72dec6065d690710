//! Mediator response service.
//!
//! One call produces one reply:
//! - build the instruction from assessment counts,
//! - send instruction, prior turns and the new message to the primary model,
//! - on an access-class failure only, resend the same request once to the
//!   fallback model.
//!
//! The streaming path never falls back: fallback models are not assumed to
//! support incremental output.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::assessment::summary::AssessmentSummary;
use crate::common::config::MediatorConfig;
use crate::common::ids::UserId;
use crate::mediator::errors::{MediatorError, MediatorResult};
use crate::mediator::prompt::build_instruction;
use crate::mediator::provider::{
    ChatCompletion, ChatMessage, ChatProvider, ChatRequest, ChatRole, FailureClass, ProviderResult,
    classify,
};
use crate::mediator::turn::{ConversationTurn, MediatorReply, TurnRole};

/// Response length cap for every model call.
pub const MAX_REPLY_TOKENS: u32 = 500;
/// Sampling temperature for every model call.
pub const REPLY_TEMPERATURE: f32 = 0.7;
/// Reply used when a model succeeds without producing text.
pub const NEUTRAL_REPLY: &str = "I'm here to help facilitate your conversation.";

/// Primary and fallback model identifiers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModelSelection {
    /// Model tried first.
    pub primary: String,
    /// Model tried once after an access-class failure.
    pub fallback: String,
}

impl From<&MediatorConfig> for ModelSelection {
    fn from(config: &MediatorConfig) -> Self {
        Self {
            primary: config.primary_model.clone(),
            fallback: config.fallback_model.clone(),
        }
    }
}

/// Which model an attempt targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Tier {
    Primary,
    Fallback,
}

impl Tier {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// Everything needed for one mediator turn.
#[derive(Clone, Debug)]
pub struct MediatorRequest {
    /// Speaking user.
    pub user_id: UserId,
    /// New message text.
    pub message: String,
    /// Prior turns, oldest first.
    pub prior_turns: Vec<ConversationTurn>,
    /// Speaking user's assessment counts.
    pub self_summaries: Option<Vec<AssessmentSummary>>,
    /// Partner's assessment counts.
    pub partner_summaries: Option<Vec<AssessmentSummary>>,
}

impl MediatorRequest {
    /// Start a request with no history and no assessment context.
    #[must_use]
    pub fn new(user_id: UserId, message: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
            prior_turns: Vec::new(),
            self_summaries: None,
            partner_summaries: None,
        }
    }

    /// Attach prior turns.
    #[must_use]
    pub fn with_turns(mut self, turns: Vec<ConversationTurn>) -> Self {
        self.prior_turns = turns;
        self
    }

    /// Attach the speaking user's assessment counts.
    #[must_use]
    pub fn with_self_summaries(mut self, summaries: Vec<AssessmentSummary>) -> Self {
        self.self_summaries = Some(summaries);
        self
    }

    /// Attach the partner's assessment counts.
    #[must_use]
    pub fn with_partner_summaries(mut self, summaries: Vec<AssessmentSummary>) -> Self {
        self.partner_summaries = Some(summaries);
        self
    }

    /// Check the request before anything is sent.
    ///
    /// # Errors
    /// Returns [`MediatorError::Validation`] if the message is blank.
    pub fn validate(&self) -> MediatorResult<()> {
        if self.message.trim().is_empty() {
            return Err(MediatorError::Validation(
                "message must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Assemble the provider messages: instruction, prior turns, new message.
    ///
    /// # Errors
    /// Returns [`MediatorError::Validation`] if the request is malformed.
    pub fn to_messages(&self) -> MediatorResult<Vec<ChatMessage>> {
        self.validate()?;

        let instruction = build_instruction(
            self.self_summaries.as_deref(),
            self.partner_summaries.as_deref(),
        );

        let mut messages = Vec::with_capacity(self.prior_turns.len() + 2);
        messages.push(ChatMessage::new(ChatRole::System, instruction));
        messages.extend(self.prior_turns.iter().map(|turn| {
            let role = match turn.role {
                TurnRole::User => ChatRole::User,
                TurnRole::Mediator => ChatRole::Assistant,
            };
            ChatMessage::new(role, turn.content.clone())
        }));
        messages.push(ChatMessage::new(ChatRole::User, self.message.clone()));
        Ok(messages)
    }
}

/// Stateless mediator service; share it behind an `Arc`.
#[derive(Clone)]
pub struct MediatorService {
    provider: Arc<dyn ChatProvider>,
    models: ModelSelection,
}

impl MediatorService {
    /// Create a service over a provider.
    #[must_use]
    pub fn new(provider: Arc<dyn ChatProvider>, models: ModelSelection) -> Self {
        Self { provider, models }
    }

    /// Produce one complete reply.
    ///
    /// # Errors
    /// Returns [`MediatorError::Validation`] for malformed input and
    /// [`MediatorError::Unavailable`] when no model produced a reply.
    #[tracing::instrument(skip_all, fields(user_id = %request.user_id))]
    pub async fn invoke(&self, request: &MediatorRequest) -> MediatorResult<MediatorReply> {
        let messages = request.to_messages()?;
        let primary = self.chat_request(Tier::Primary, messages);

        let err = match self.attempt(Tier::Primary, &primary).await {
            Ok(completion) => return Ok(reply_from(&completion)),
            Err(err) => err,
        };

        match classify(&err) {
            FailureClass::Access => {
                warn!(
                    model = %self.models.primary,
                    error = %err,
                    "Primary model not accessible, retrying on {}",
                    self.models.fallback
                );
                let fallback = ChatRequest {
                    model: self.models.fallback.clone(),
                    ..primary
                };
                match self.attempt(Tier::Fallback, &fallback).await {
                    Ok(completion) => Ok(reply_from(&completion)),
                    Err(fallback_err) => {
                        error!(
                            model = %self.models.fallback,
                            error = %fallback_err,
                            "Fallback model failed"
                        );
                        Err(MediatorError::Unavailable)
                    }
                }
            }
            FailureClass::Other => {
                error!(model = %self.models.primary, error = %err, "Primary model failed");
                Err(MediatorError::Unavailable)
            }
        }
    }

    /// Produce a reply incrementally, handing each non-empty fragment to
    /// `on_fragment` in arrival order.
    ///
    /// # Errors
    /// Returns [`MediatorError::Validation`] for malformed input and
    /// [`MediatorError::Unavailable`] if the stream cannot be opened or breaks.
    #[tracing::instrument(skip_all, fields(user_id = %request.user_id))]
    pub async fn invoke_streaming<F>(
        &self,
        request: &MediatorRequest,
        mut on_fragment: F,
    ) -> MediatorResult<()>
    where
        F: FnMut(&str) + Send,
    {
        let messages = request.to_messages()?;
        let chat = self.chat_request(Tier::Primary, messages);

        info!(
            provider = self.provider.name(),
            model = %chat.model,
            "Streaming mediator reply"
        );
        let mut fragments = self.provider.stream(&chat).await.map_err(|err| {
            error!(model = %chat.model, error = %err, "Could not open reply stream");
            MediatorError::Unavailable
        })?;

        let mut delivered = 0_usize;
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment.map_err(|err| {
                error!(
                    model = %chat.model,
                    error = %err,
                    delivered,
                    "Reply stream broke"
                );
                MediatorError::Unavailable
            })?;
            if fragment.is_empty() {
                continue;
            }
            on_fragment(&fragment);
            delivered += 1;
        }

        debug!(delivered, "Reply stream finished");
        Ok(())
    }

    fn chat_request(&self, tier: Tier, messages: Vec<ChatMessage>) -> ChatRequest {
        let model = match tier {
            Tier::Primary => &self.models.primary,
            Tier::Fallback => &self.models.fallback,
        };
        ChatRequest {
            model: model.clone(),
            messages,
            max_tokens: MAX_REPLY_TOKENS,
            temperature: REPLY_TEMPERATURE,
        }
    }

    async fn attempt(
        &self,
        tier: Tier,
        request: &ChatRequest,
    ) -> ProviderResult<ChatCompletion> {
        info!(
            provider = self.provider.name(),
            tier = tier.as_str(),
            model = %request.model,
            turns = request.messages.len(),
            "Requesting mediator reply"
        );
        let completion = self.provider.complete(request).await?;
        debug!(
            tier = tier.as_str(),
            candidates = completion.candidates.len(),
            "Model responded"
        );
        Ok(completion)
    }
}

fn reply_from(completion: &ChatCompletion) -> MediatorReply {
    let text = completion.first_text().unwrap_or_else(|| {
        debug!("Model returned no text, using the neutral reply");
        NEUTRAL_REPLY
    });
    MediatorReply::now(text)
}

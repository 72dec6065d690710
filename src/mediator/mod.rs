//! Mediator response pipeline.
//!
//! - `turn`: conversation turns and replies
//! - `prompt`: instruction text built from assessment counts
//! - `provider`: chat-completion backends and failure classification
//! - `service`: primary/fallback invocation and streaming

pub mod errors;
pub mod prompt;
pub mod provider;
pub mod service;
pub mod turn;

pub use errors::{MediatorError, MediatorResult};
pub use provider::{ChatProvider, OpenAiProvider, ProviderError};
pub use service::{
    MAX_REPLY_TOKENS, MediatorRequest, MediatorService, ModelSelection, NEUTRAL_REPLY,
    REPLY_TEMPERATURE,
};
pub use turn::{ConversationTurn, MediatorReply, RawTurn, TurnRole, validate_turns};

//! Model providers behind the mediator.

pub mod chat_provider;
pub mod openai;
#[cfg(test)]
pub(crate) mod scripted;

pub use chat_provider::{
    ChatCompletion, ChatMessage, ChatProvider, ChatRequest, ChatRole, FailureClass,
    FragmentStream, ProviderError, ProviderResult, classify, is_access_status,
};
pub use openai::OpenAiProvider;

//! Scripted provider used by tests: replies per model and records every call.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;

use crate::mediator::provider::chat_provider::{
    ChatCompletion, ChatProvider, ChatRequest, FragmentStream, ProviderError, ProviderResult,
};

/// What a model does when called.
#[derive(Clone, Debug)]
pub enum Script {
    /// Succeed with this first candidate (`None` means no text).
    Reply(Option<String>),
    /// Fail with an HTTP status.
    Status(u16),
    /// Fail before any response arrives.
    ConnectionLost,
    /// Stream these fragments, then finish.
    Fragments(Vec<String>),
    /// Stream these fragments, then break.
    FragmentsThenFail(Vec<String>),
    /// Never answer.
    Stall,
}

impl Script {
    pub fn reply(text: &str) -> Self {
        Self::Reply(Some(text.to_string()))
    }

    pub fn fragments(parts: &[&str]) -> Self {
        Self::Fragments(parts.iter().map(|p| (*p).to_string()).collect())
    }
}

#[derive(Default)]
pub struct ScriptedProvider {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, model: &str, script: Script) -> Self {
        self.scripts.insert(model.to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, model: &str) -> Vec<ChatRequest> {
        self.calls()
            .into_iter()
            .filter(|call| call.model == model)
            .collect()
    }

    fn script_for(&self, request: &ChatRequest) -> Script {
        self.calls.lock().unwrap().push(request.clone());
        self.scripts
            .get(&request.model)
            .cloned()
            .unwrap_or(Script::Status(404))
    }
}

fn status(code: u16) -> ProviderError {
    ProviderError::Status {
        status: code,
        body: format!("scripted status {code}"),
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> ProviderResult<ChatCompletion> {
        match self.script_for(request) {
            Script::Reply(text) => Ok(ChatCompletion {
                candidates: text.into_iter().map(Some).collect(),
            }),
            Script::Fragments(parts) => Ok(ChatCompletion {
                candidates: vec![Some(parts.concat())],
            }),
            Script::Status(code) => Err(status(code)),
            Script::ConnectionLost | Script::FragmentsThenFail(_) => {
                Err(ProviderError::Connection("scripted connection loss".to_string()))
            }
            Script::Stall => std::future::pending().await,
        }
    }

    async fn stream(&self, request: &ChatRequest) -> ProviderResult<FragmentStream> {
        let items: Vec<ProviderResult<String>> = match self.script_for(request) {
            Script::Reply(text) => text.into_iter().map(Ok).collect(),
            Script::Fragments(parts) => parts.into_iter().map(Ok).collect(),
            Script::FragmentsThenFail(parts) => parts
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(ProviderError::Connection(
                    "scripted stream break".to_string(),
                ))))
                .collect(),
            Script::Status(code) => return Err(status(code)),
            Script::ConnectionLost => {
                return Err(ProviderError::Connection(
                    "scripted connection loss".to_string(),
                ));
            }
            Script::Stall => return std::future::pending().await,
        };
        Ok(stream::iter(items).boxed())
    }
}

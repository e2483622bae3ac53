//! Scripted provider: replays canned chunk rounds and records requests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use parley_provider::{
    ChatChunk, ChatParams, ChatStream, Provider, ProviderError, ToolCallDelta,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub enum Round {
    Chunks(Vec<ChatChunk>),
    /// Chunks followed by a mid-stream failure
    Broken(Vec<ChatChunk>, String),
    Reject(String),
}

#[derive(Clone, Default)]
pub struct ScriptedProvider {
    rounds: Arc<Mutex<VecDeque<Round>>>,
    requests: Arc<Mutex<Vec<ChatParams>>>,
}

impl ScriptedProvider {
    pub fn new(rounds: Vec<Round>) -> Self {
        Self {
            rounds: Arc::new(Mutex::new(rounds.into())),
            requests: Arc::default(),
        }
    }

    /// Every request seen so far
    pub fn requests(&self) -> Vec<ChatParams> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn stream_chat(&self, params: ChatParams) -> Result<ChatStream, ProviderError> {
        self.requests.lock().unwrap().push(params);
        let round = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Round::Chunks(vec![ChatChunk::text("(script exhausted)")]));

        match round {
            Round::Chunks(chunks) => Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok)))),
            Round::Broken(chunks, message) => {
                let mut items: Vec<Result<ChatChunk, ProviderError>> =
                    chunks.into_iter().map(Ok).collect();
                items.push(Err(ProviderError::Stream(message)));
                Ok(Box::pin(stream::iter(items)))
            }
            Round::Reject(message) => Err(ProviderError::Api(message)),
        }
    }

    fn default_model(&self) -> String {
        "scripted-model".to_string()
    }

    fn is_configured(&self) -> bool {
        true
    }
}

pub fn text(s: &str) -> ChatChunk {
    ChatChunk::text(s)
}

/// Complete tool call in a single fragment
pub fn call(index: u32, id: &str, name: &str, arguments: &str) -> ChatChunk {
    ChatChunk::tool_call(ToolCallDelta {
        index,
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        arguments: Some(arguments.to_string()),
    })
}

/// Argument continuation for an already-announced call
pub fn args_fragment(index: u32, arguments: &str) -> ChatChunk {
    ChatChunk::tool_call(ToolCallDelta {
        index,
        id: None,
        name: None,
        arguments: Some(arguments.to_string()),
    })
}

pub fn reply(s: &str) -> Round {
    Round::Chunks(vec![text(s)])
}

//! Completion endpoint access
//!
//! Wire types for the OpenAI chat-completions dialect and a streaming
//! [`Provider`] trait. A round is consumed as a [`ChatStream`] of
//! [`ChatChunk`]s carrying text fragments and tool-call fragments.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

use thiserror::Error;

pub mod openai;

pub use openai::OpenAiProvider;

/// Completion endpoint errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("SIGNAL LOST: {0}")]
    Request(#[from] reqwest::Error),

    #[error("DECRYPTION ERROR: {0}")]
    Json(#[from] serde_json::Error),

    #[error("NODE REJECTED: {0}")]
    Api(String),

    #[error("ACCESS DENIED: NO API KEY")]
    NoApiKey,

    #[error("STREAM BROKEN: {0}")]
    Stream(String),

    #[error("RATE LIMITED - RETREAT")]
    RateLimited,
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        f.write_str(name)
    }
}

/// Transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn bare(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::bare(Role::System, Some(content.into()))
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::bare(Role::User, Some(content.into()))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::bare(Role::Assistant, Some(content.into()))
    }

    /// Assistant turn declaring tool calls, with whatever text preceded them
    pub fn assistant_tool_calls(content: Option<String>, calls: Vec<ToolCallDef>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::bare(Role::Assistant, content.filter(|c| !c.is_empty()))
        }
    }

    pub fn tool(
        call_id: impl Into<String>,
        name: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            name: Some(name.into()),
            ..Self::bare(Role::Tool, Some(result.into()))
        }
    }

    /// Declared tool calls, empty for anything but an assistant tool turn
    pub fn declared_calls(&self) -> &[ToolCallDef] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Tool call as recorded in an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDef {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCallDef {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function name and its raw JSON argument text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Tool specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDef,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Function schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One streaming completion request
#[derive(Debug, Clone, Default)]
pub struct ChatParams {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Incremental tool-call fragment, keyed by its position in the round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallDelta {
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// One streamed chunk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatChunk {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallDelta>,
    pub finish_reason: Option<String>,
}

impl ChatChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn tool_call(delta: ToolCallDelta) -> Self {
        Self {
            tool_calls: vec![delta],
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.as_deref().map_or(true, str::is_empty)
            && self.tool_calls.is_empty()
            && self.finish_reason.is_none()
    }
}

/// Chunks of one round, ending when the endpoint closes the stream
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// Streaming completion endpoint
#[async_trait]
pub trait Provider: Send + Sync {
    async fn stream_chat(&self, params: ChatParams) -> Result<ChatStream>;
    fn default_model(&self) -> String;
    fn is_configured(&self) -> bool;
}

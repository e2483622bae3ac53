//! OpenAI-compatible streaming node
//!
//! Works against any endpoint speaking the chat-completions dialect
//! (OpenAI, OpenRouter, Groq, Ollama). Replies are read as server-sent
//! events until `[DONE]`.

use crate::*;
use eventsource_stream::Eventsource;
use futures::{future, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, trace, warn};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DONE_MARKER: &str = "[DONE]";

/// Chat-completions client with streaming replies
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_base = api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base,
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_request(&self, params: &ChatParams) -> Result<Value> {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let mut body = json!({
            "model": model,
            "messages": serde_json::to_value(&params.messages)?,
            "stream": true,
        });

        if let Some(max_tokens) = params.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = params.temperature {
            body["temperature"] = json!(temperature);
        }
        if !params.tools.is_empty() {
            body["tools"] = serde_json::to_value(&params.tools)?;
        }

        Ok(body)
    }
}

/// Message carried by an `{"error": ...}` payload, if any
fn error_message(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    Some("UNKNOWN ERROR".to_string())
}

/// Parse one SSE data payload. Keep-alive and metadata chunks yield `None`.
pub fn parse_event(data: &str) -> Result<Option<ChatChunk>> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(data)?;
    if let Some(message) = error_message(&value) {
        return Err(ProviderError::Api(message));
    }

    let choice = match value["choices"].as_array().and_then(|c| c.first()) {
        Some(choice) => choice,
        None => {
            trace!("◆ SKIPPING CHUNK WITHOUT CHOICES");
            return Ok(None);
        }
    };
    let delta = &choice["delta"];

    let tool_calls = delta["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .map(|(position, call)| {
                    let function = &call["function"];
                    ToolCallDelta {
                        index: call["index"].as_u64().unwrap_or(position as u64) as u32,
                        id: call["id"].as_str().map(str::to_string),
                        name: function["name"].as_str().map(str::to_string),
                        arguments: function["arguments"].as_str().map(str::to_string),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let chunk = ChatChunk {
        content: delta["content"].as_str().map(str::to_string),
        tool_calls,
        finish_reason: choice["finish_reason"].as_str().map(str::to_string),
    };

    Ok((!chunk.is_empty()).then_some(chunk))
}

/// Turn a successful streaming response into chunks
fn chunk_stream(response: reqwest::Response) -> ChatStream {
    let stream = response
        .bytes_stream()
        .eventsource()
        .map(|event| match event {
            Ok(event) => Ok(event.data),
            Err(e) => Err(ProviderError::Stream(e.to_string())),
        })
        .take_while(|data| future::ready(!matches!(data, Ok(d) if d.trim() == DONE_MARKER)))
        .filter_map(|data| {
            future::ready(match data {
                Ok(data) => parse_event(&data).transpose(),
                Err(e) => Some(Err(e)),
            })
        });

    Box::pin(stream)
}

#[async_trait::async_trait]
impl Provider for OpenAiProvider {
    async fn stream_chat(&self, params: ChatParams) -> Result<ChatStream> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }
        trace!("◆ ESTABLISHING UPLINK TO {}", self.api_base);

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(&params)?;
        debug!(
            "◆ STREAMING {} MESSAGES, {} TOOLS",
            params.messages.len(),
            params.tools.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|value| error_message(&value))
                .unwrap_or_else(|| format!("HTTP {}: {}", status, text.trim()));
            warn!("◆ NODE REJECTED REQUEST: {}", message);
            return Err(ProviderError::Api(message));
        }

        Ok(chunk_stream(response))
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

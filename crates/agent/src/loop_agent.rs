//! Agent loop - core processing engine
//!
//! One `prompt` call runs up to `max_tool_rounds + 1` completion rounds.
//! Each round streams the reply, collecting text and tool-call fragments.
//! A round without tool calls ends the prompt. Otherwise every call is
//! dispatched in order, its result appended to the transcript, and the
//! model is asked again. The last round is sent without tools so the
//! model has to answer in text.

use futures::{Stream, StreamExt};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

use parley_mcp::ToolServerManager;
use parley_provider::{ChatParams, Provider};

use crate::stream::{ToolCallAccumulator, ToolCallRequest};
use crate::tools::{ToolDescriptor, ToolError, ToolRegistry};
use crate::transcript::Transcript;
use crate::{AgentError, Result};

const DEFAULT_MAX_TOOL_ROUNDS: u32 = 5;

/// Progress of one prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Streamed text fragment
    Delta(String),
    /// A tool is about to run
    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },
    /// A tool finished; failures carry their error text
    ToolResult {
        id: String,
        name: String,
        content: String,
        is_error: bool,
    },
    /// Final reply text, emitted once
    Finished(String),
}

pub type EventStream<'a> = Pin<Box<dyn Stream<Item = Result<AgentEvent>> + Send + 'a>>;

/// The agent loop owns the provider, the tool registry and the remote
/// tool-server sessions. Transcripts belong to the caller.
pub struct AgentLoop<P: Provider> {
    provider: Arc<P>,
    model: String,
    system_prompt: Option<String>,
    locals: Vec<ToolDescriptor>,
    servers: ToolServerManager,
    registry: ToolRegistry,
    max_tool_rounds: u32,
}

pub struct AgentLoopBuilder<P: Provider> {
    provider: P,
    model: Option<String>,
    system_prompt: Option<String>,
    tools: Vec<ToolDescriptor>,
    servers: ToolServerManager,
    max_tool_rounds: u32,
}

impl<P: Provider> AgentLoopBuilder<P> {
    /// Model name; the provider's default when unset
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Prepended to empty transcripts. `None` or an empty prompt disables it.
    pub fn system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.is_empty());
        self
    }

    pub fn tool(mut self, tool: ToolDescriptor) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Running tool-server sessions whose tools join the registry
    pub fn tool_servers(mut self, servers: ToolServerManager) -> Self {
        self.servers = servers;
        self
    }

    pub fn max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn build(self) -> AgentLoop<P> {
        let model = self
            .model
            .unwrap_or_else(|| self.provider.default_model());
        let registry = ToolRegistry::build(self.tools.clone(), self.servers.tools());
        info!(
            "◆ AGENT ONLINE: {} ({} tools)",
            model,
            registry.len()
        );

        AgentLoop {
            provider: Arc::new(self.provider),
            model,
            system_prompt: self.system_prompt,
            locals: self.tools,
            servers: self.servers,
            registry,
            max_tool_rounds: self.max_tool_rounds,
        }
    }
}

impl<P: Provider> AgentLoop<P> {
    pub fn builder(provider: P) -> AgentLoopBuilder<P> {
        AgentLoopBuilder {
            provider,
            model: None,
            system_prompt: None,
            tools: Vec::new(),
            servers: ToolServerManager::new(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn max_tool_rounds(&self) -> u32 {
        self.max_tool_rounds
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn tool_servers(&self) -> &ToolServerManager {
        &self.servers
    }

    /// Replace all remote sessions with the servers listed in `path`.
    /// Returns the number of remote tools now available.
    pub async fn load_tool_servers(&mut self, path: &Path) -> usize {
        self.servers.stop().await;
        let loaded = self.servers.load_file(path).await;
        self.rebuild_registry();
        loaded
    }

    /// Stop every remote session. Local tools stay usable.
    pub async fn shutdown(&mut self) {
        self.servers.stop().await;
        self.rebuild_registry();
        info!("◆ AGENT OFFLINE");
    }

    fn rebuild_registry(&mut self) {
        self.registry = ToolRegistry::build(self.locals.clone(), self.servers.tools());
    }

    /// One-off prompt on a fresh transcript
    pub async fn ask(&self, text: &str) -> Result<String> {
        let mut transcript = Transcript::new();
        self.prompt(text, &[], &mut transcript, self.max_tool_rounds)
            .await
    }

    /// Run a prompt to completion and return the final reply
    pub async fn prompt(
        &self,
        text: &str,
        extra_tools: &[ToolDescriptor],
        transcript: &mut Transcript,
        max_tool_rounds: u32,
    ) -> Result<String> {
        let mut events = self.prompt_stream(text, extra_tools, transcript, max_tool_rounds);
        let mut reply = String::new();
        while let Some(event) = events.next().await {
            if let AgentEvent::Finished(text) = event? {
                reply = text;
            }
        }
        Ok(reply)
    }

    /// Run a prompt, yielding text fragments and tool activity as they
    /// happen. `extra_tools` are visible for this call only and shadow
    /// registry tools of the same name. Empty input yields nothing and
    /// leaves the transcript untouched.
    pub fn prompt_stream<'a>(
        &'a self,
        text: &'a str,
        extra_tools: &'a [ToolDescriptor],
        transcript: &'a mut Transcript,
        max_tool_rounds: u32,
    ) -> EventStream<'a> {
        Box::pin(async_stream::stream! {
            if text.is_empty() {
                debug!("◆ EMPTY INPUT, NOTHING SENT");
                return;
            }

            if let Some(prompt) = &self.system_prompt {
                transcript.start_with_system(prompt);
            }
            transcript.push_user(text);

            let registry = self.registry.with_overrides(extra_tools);
            let definitions = registry.definitions();

            for round in 0..=max_tool_rounds {
                let allow_tools = round < max_tool_rounds;
                debug!(
                    "◆ ROUND {}/{} ({} messages, tools {})",
                    round + 1,
                    max_tool_rounds + 1,
                    transcript.len(),
                    if allow_tools { "offered" } else { "withheld" }
                );

                let params = ChatParams {
                    model: self.model.clone(),
                    messages: transcript.messages().to_vec(),
                    tools: if allow_tools { definitions.clone() } else { Vec::new() },
                    ..Default::default()
                };

                let mut chunks = match self.provider.stream_chat(params).await {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        yield Err(AgentError::from(e));
                        return;
                    }
                };

                let mut reply = String::new();
                let mut calls = ToolCallAccumulator::new();
                while let Some(chunk) = chunks.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            yield Err(AgentError::from(e));
                            return;
                        }
                    };
                    if let Some(fragment) = chunk.content.filter(|c| !c.is_empty()) {
                        reply.push_str(&fragment);
                        yield Ok(AgentEvent::Delta(fragment));
                    }
                    for delta in &chunk.tool_calls {
                        calls.push(delta);
                    }
                }

                if calls.is_empty() || !allow_tools {
                    if !calls.is_empty() {
                        warn!(
                            "◆ MODEL REQUESTED {} TOOLS AFTER THE LAST ROUND, IGNORING",
                            calls.len()
                        );
                    }
                    transcript.push_assistant(reply.clone());
                    yield Ok(AgentEvent::Finished(reply));
                    return;
                }

                let requests = calls.finish();
                transcript.push_tool_calls(
                    Some(reply),
                    requests.iter().map(ToolCallRequest::to_def).collect(),
                );

                for request in requests {
                    yield Ok(AgentEvent::ToolCall {
                        id: request.id.clone(),
                        name: request.name.clone(),
                        arguments: request.arguments.clone(),
                    });

                    let (content, is_error) = match dispatch(&registry, &request).await {
                        Ok(content) => (content, false),
                        Err(e) => {
                            warn!("◆ TOOL {} FAILED: {}", request.name, e);
                            (format!("Error: {}", e), true)
                        }
                    };
                    transcript.push_tool_result(&request.id, &request.name, content.clone());

                    yield Ok(AgentEvent::ToolResult {
                        id: request.id,
                        name: request.name,
                        content,
                        is_error,
                    });
                }
            }
        })
    }
}

/// Parse, resolve and invoke one call
async fn dispatch(
    registry: &ToolRegistry,
    request: &ToolCallRequest,
) -> std::result::Result<String, ToolError> {
    let args = request.parse_arguments()?;
    let tool = registry.resolve(&request.name)?;
    debug!("◆ EXECUTING TOOL: {}", tool.name);
    tool.invoke(args).await
}

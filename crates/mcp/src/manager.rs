//! Tool-server lifecycle
//!
//! Sessions are started in configuration order and stopped in reverse.
//! A server that fails to start is logged and skipped; the others still
//! load.

use parley_config::{ConfigError, ToolServersConfig};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::session::{McpSession, ToolSession};
use crate::tool::{strip_nulls, McpTool};
use crate::Result;

/// Longest function name completion endpoints accept
const MAX_TOOL_NAME_LEN: usize = 64;

/// `{server}_{tool}` reduced to `[A-Za-z0-9_-]`, at most 64 characters.
/// Other characters become `_`.
pub fn qualified_tool_name(server: &str, tool: &str) -> String {
    format!("{}_{}", server, tool)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_TOOL_NAME_LEN)
        .collect()
}

/// A tool offered by a running session
#[derive(Clone)]
pub struct RemoteTool {
    pub server: String,
    pub tool: McpTool,
    session: Arc<dyn ToolSession>,
}

impl std::fmt::Debug for RemoteTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTool")
            .field("server", &self.server)
            .field("tool", &self.tool.name)
            .finish()
    }
}

impl RemoteTool {
    /// Registry name, see [`qualified_tool_name`]
    pub fn qualified_name(&self) -> String {
        qualified_tool_name(&self.server, &self.tool.name)
    }

    /// Name the server knows the tool by
    pub fn name(&self) -> &str {
        &self.tool.name
    }

    pub fn description(&self) -> &str {
        self.tool.description.as_deref().unwrap_or_default()
    }

    /// Input schema with null-valued fields removed
    pub fn parameters(&self) -> Value {
        strip_nulls(self.tool.input_schema.clone())
    }

    /// Forward a call to the owning session under the server-side name
    pub async fn call(&self, arguments: Map<String, Value>) -> Result<String> {
        self.session.call_tool(&self.tool.name, arguments).await
    }
}

/// Owns every running tool-server session
#[derive(Default)]
pub struct ToolServerManager {
    sessions: Vec<Arc<dyn ToolSession>>,
    tools: Vec<RemoteTool>,
}

impl ToolServerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start every enabled server. Returns the number of tools registered.
    pub async fn load(&mut self, config: &ToolServersConfig) -> usize {
        let before = self.tools.len();

        for (name, server) in &config.servers {
            if !server.is_enabled() {
                warn!("◆ TOOL SERVER '{}' DISABLED, SKIPPING", name);
                continue;
            }

            let session = match McpSession::connect(name, server).await {
                Ok(session) => session,
                Err(e) => {
                    error!("◆ TOOL SERVER '{}' FAILED TO START: {}", name, e);
                    continue;
                }
            };

            if let Err(e) = self.attach(Arc::new(session)).await {
                error!("◆ TOOL SERVER '{}' FAILED TO LIST TOOLS: {}", name, e);
            }
        }

        let loaded = self.tools.len() - before;
        info!(
            "◆ {} TOOLS FROM {} TOOL SERVERS",
            loaded,
            self.sessions.len()
        );
        loaded
    }

    /// Read the configuration file and load it. A missing or malformed
    /// file loads nothing.
    pub async fn load_file(&mut self, path: &Path) -> usize {
        match ToolServersConfig::load_from(path).await {
            Ok(config) => self.load(&config).await,
            Err(ConfigError::NotFound(path)) => {
                warn!("◆ NO TOOL SERVER CONFIG AT {:?}", path);
                0
            }
            Err(e) => {
                error!("◆ TOOL SERVER CONFIG UNREADABLE: {}", e);
                0
            }
        }
    }

    /// Adopt a started session and register its tools. On failure the
    /// session is closed and not kept.
    pub async fn attach(&mut self, session: Arc<dyn ToolSession>) -> Result<usize> {
        let tools = match session.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                if let Err(close_err) = session.close().await {
                    warn!("◆ CLOSING {} FAILED: {}", session.server_name(), close_err);
                }
                return Err(e);
            }
        };

        let server = session.server_name().to_string();
        let count = tools.len();
        for tool in &tools {
            let qualified = qualified_tool_name(&server, &tool.name);
            if qualified != format!("{}_{}", server, tool.name) {
                warn!("◆ {}.{} REGISTERED AS {}", server, tool.name, qualified);
            }
        }
        self.tools.extend(tools.into_iter().map(|tool| RemoteTool {
            server: server.clone(),
            tool,
            session: session.clone(),
        }));
        self.sessions.push(session);

        info!("◆ TOOL SERVER '{}' REGISTERED {} TOOLS", server, count);
        Ok(count)
    }

    /// Close every session, most recently started first. Safe to repeat.
    pub async fn stop(&mut self) {
        self.tools.clear();
        while let Some(session) = self.sessions.pop() {
            info!("◆ CLOSING TOOL SERVER '{}'", session.server_name());
            if let Err(e) = session.close().await {
                warn!("◆ CLOSING {} FAILED: {}", session.server_name(), e);
            }
        }
    }

    pub fn tools(&self) -> &[RemoteTool] {
        &self.tools
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(RemoteTool::qualified_name).collect()
    }

    /// Running servers in start order
    pub fn server_names(&self) -> Vec<String> {
        self.sessions
            .iter()
            .map(|s| s.server_name().to_string())
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

//! Tool-server configuration file
//!
//! ```json
//! {
//!   // local process speaking MCP over stdin/stdout
//!   "mcpServers": {
//!     "files": { "transport": "stdio", "command": "npx", "args": ["-y", "server-fs", "/tmp"] },
//!     "search": { "transport": "http", "url": "http://localhost:8931/mcp" },
//!     "legacy": { "transport": "sse", "url": "http://localhost:8000/sse", "disabled": true },
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{jsonc, ConfigError, Result};

/// How a tool server is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Child process, JSON-RPC over stdin/stdout
    Stdio,
    /// Legacy server-sent events entry, reached over streamable HTTP
    Sse,
    /// Streamable HTTP
    #[serde(alias = "streamable-http", alias = "streamable_http", alias = "streamablehttp")]
    Http,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Sse => "sse",
            TransportKind::Http => "http",
        };
        f.write_str(name)
    }
}

/// One entry of the `mcpServers` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl ServerConfig {
    /// Stdio server entry
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            transport: Some(TransportKind::Stdio),
            command: Some(command.into()),
            args,
            ..Default::default()
        }
    }

    /// Streamable HTTP server entry
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            transport: Some(TransportKind::Http),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Effective transport: explicit, else `http` when a url is given, else `stdio`
    pub fn transport_kind(&self) -> TransportKind {
        match self.transport {
            Some(kind) => kind,
            None if self.url.is_some() => TransportKind::Http,
            None => TransportKind::Stdio,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }
}

/// Root of the tool-server configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolServersConfig {
    /// Server table, kept in file order
    #[serde(default, rename = "mcpServers")]
    pub servers: IndexMap<String, ServerConfig>,
}

/// File shape before each entry is checked
#[derive(Deserialize)]
struct RawServersFile {
    #[serde(default, rename = "mcpServers")]
    servers: IndexMap<String, Value>,
}

impl ToolServersConfig {
    /// Parse comment-tolerant JSON text. Text that is not JSON fails;
    /// an entry that does not describe a server is logged and left out.
    pub fn parse(text: &str) -> Result<Self> {
        let cleaned = jsonc::strip(text);
        let raw: RawServersFile = serde_json::from_str(&cleaned)?;

        let mut servers = IndexMap::with_capacity(raw.servers.len());
        for (name, entry) in raw.servers {
            match serde_json::from_value::<ServerConfig>(entry) {
                Ok(server) => {
                    servers.insert(name, server);
                }
                Err(e) => warn!("◆ TOOL SERVER '{}' SKIPPED, BAD ENTRY: {}", name, e),
            }
        }

        Ok(Self { servers })
    }

    /// Load from a file, `ConfigError::NotFound` when it does not exist
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        debug!("◆ READING TOOL SERVERS FROM {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Save as pretty JSON
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Servers not marked `disabled`, in file order
    pub fn enabled(&self) -> impl Iterator<Item = (&String, &ServerConfig)> {
        self.servers.iter().filter(|(_, server)| server.is_enabled())
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }
}

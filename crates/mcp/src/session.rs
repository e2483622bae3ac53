//! Protocol sessions on top of the `rmcp` client

use async_trait::async_trait;
use parley_config::{ServerConfig, TransportKind};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::model::{CallToolRequestParams, ClientCapabilities, ClientInfo, Implementation};
use rmcp::service::{Peer, RunningService, ServiceError};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::tool::{into_text, McpTool};
use crate::{McpError, Result, CLIENT_NAME, DEFAULT_REQUEST_TIMEOUT};

/// A started tool server
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Name from the configuration file
    fn server_name(&self) -> &str;

    /// Full tool catalog
    async fn list_tools(&self) -> Result<Vec<McpTool>>;

    /// Invoke a tool by its server-side name, returning its text output
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String>;

    /// End the session; later calls fail
    async fn close(&self) -> Result<()>;
}

type ClientService = RunningService<RoleClient, ClientInfo>;

/// MCP session driven by an `rmcp` running client
pub struct McpSession {
    name: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<ClientService>>,
    stderr: Mutex<Option<JoinHandle<()>>>,
    server_info: Option<Implementation>,
    timeout: Duration,
}

impl std::fmt::Debug for McpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSession")
            .field("name", &self.name)
            .field("server_info", &self.server_info)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl McpSession {
    /// Open the configured transport and run the handshake
    pub async fn connect(name: &str, config: &ServerConfig) -> Result<Self> {
        Self::connect_with_timeout(name, config, DEFAULT_REQUEST_TIMEOUT).await
    }

    pub async fn connect_with_timeout(
        name: &str,
        config: &ServerConfig,
        timeout: Duration,
    ) -> Result<Self> {
        match config.transport_kind() {
            TransportKind::Stdio => {
                let command = config
                    .command
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| McpError::InvalidConfig(format!("{}: missing command", name)))?;

                let mut cmd = Command::new(command);
                cmd.args(&config.args).envs(&config.env);
                debug!("◆ LAUNCHING TOOL SERVER '{}': {} {:?}", name, command, config.args);

                let (transport, stderr) = TokioChildProcess::builder(cmd)
                    .stderr(Stdio::piped())
                    .spawn()
                    .map_err(|source| McpError::Spawn {
                        command: command.to_string(),
                        source,
                    })?;
                let stderr = stderr.map(|pipe| tokio::spawn(log_stderr(name.to_string(), pipe)));

                match handshake(name, client_info().serve(transport), timeout).await {
                    Ok(service) => Ok(Self::ready(name, service, stderr, timeout)),
                    Err(e) => {
                        if let Some(task) = stderr {
                            task.abort();
                        }
                        Err(e)
                    }
                }
            }
            kind @ (TransportKind::Http | TransportKind::Sse) => {
                let url = config
                    .url
                    .as_deref()
                    .ok_or_else(|| McpError::InvalidConfig(format!("{}: missing url", name)))?;
                if kind == TransportKind::Sse {
                    debug!("◆ TOOL SERVER '{}' ASKED FOR SSE, USING STREAMABLE HTTP", name);
                }

                let client = reqwest::Client::builder()
                    .default_headers(header_map(name, &config.headers))
                    .build()?;
                let transport = StreamableHttpClientTransport::with_client(
                    client,
                    StreamableHttpClientTransportConfig::with_uri(url.to_string()),
                );

                let service = handshake(name, client_info().serve(transport), timeout).await?;
                Ok(Self::ready(name, service, None, timeout))
            }
        }
    }

    fn ready(
        name: &str,
        service: ClientService,
        stderr: Option<JoinHandle<()>>,
        timeout: Duration,
    ) -> Self {
        let server_info = service.peer_info().map(|info| info.server_info.clone());
        match &server_info {
            Some(server) => info!(
                "◆ TOOL SERVER '{}' ONLINE ({} {})",
                name, server.name, server.version
            ),
            None => info!("◆ TOOL SERVER '{}' ONLINE", name),
        }

        Self {
            name: name.to_string(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            stderr: Mutex::new(stderr),
            server_info,
            timeout,
        }
    }

    /// `serverInfo` from the handshake
    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    async fn ensure_open(&self) -> Result<()> {
        if self.service.lock().await.is_none() {
            return Err(McpError::Closed);
        }
        Ok(())
    }

    async fn deadline<T, F>(&self, method: &str, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ServiceError>>,
    {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| McpError::Timeout(method.to_string()))?
            .map_err(McpError::from)
    }
}

#[async_trait]
impl ToolSession for McpSession {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<McpTool>> {
        self.ensure_open().await?;
        let tools = self.deadline("tools/list", self.peer.list_all_tools()).await?;
        debug!("◆ {} LISTS {} TOOLS", self.name, tools.len());
        Ok(tools.into_iter().map(McpTool::from).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String> {
        self.ensure_open().await?;
        debug!("◆ {} CALL {}", self.name, name);

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_string().into(),
            arguments: Some(arguments),
            task: None,
        };
        let result = self.deadline("tools/call", self.peer.call_tool(params)).await?;
        into_text(result)
    }

    async fn close(&self) -> Result<()> {
        let service = self.service.lock().await.take();
        if let Some(task) = self.stderr.lock().await.take() {
            task.abort();
        }

        let Some(service) = service else {
            return Ok(());
        };
        match service.cancel().await {
            Ok(reason) => debug!("◆ {} CLOSED: {:?}", self.name, reason),
            Err(e) => warn!("◆ {} DID NOT SHUT DOWN CLEANLY: {}", self.name, e),
        }
        Ok(())
    }
}

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: CLIENT_NAME.to_string(),
            title: Some("Parley".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// Wait for `initialize` to complete within `timeout`
async fn handshake<F, E>(name: &str, serving: F, timeout: Duration) -> Result<ClientService>
where
    F: Future<Output = std::result::Result<ClientService, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, serving).await {
        Ok(Ok(service)) => Ok(service),
        Ok(Err(e)) => Err(McpError::Handshake(format!("{}: {}", name, e))),
        Err(_) => Err(McpError::Timeout(format!("initialize from {}", name))),
    }
}

/// Configured headers for every request; invalid entries are skipped
fn header_map(server: &str, headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let (Ok(header), Ok(header_value)) =
            (HeaderName::from_str(key), HeaderValue::from_str(value.trim()))
        else {
            warn!("◆ {} IGNORING INVALID HEADER {}", server, key);
            continue;
        };
        map.insert(header, header_value);
    }
    map
}

async fn log_stderr(server: String, pipe: ChildStderr) {
    let mut lines = BufReader::new(pipe).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("◆ {} STDERR: {}", server, line);
    }
}

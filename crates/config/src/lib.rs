//! Configuration management for parley
//!
//! Settings are resolved once at startup from, in order of precedence,
//! explicit overrides (command-line flags), environment variables and the
//! selected provider's defaults. The tool-server file is loaded separately
//! (see [`servers`]).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

pub mod jsonc;
pub mod paths;
pub mod servers;

pub use paths::{data_dir, files_dir, tool_servers_path};
pub use servers::{ServerConfig, ToolServersConfig, TransportKind};

/// Errors in configuration systems
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("DATA LINK ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("MALFORMED CONFIG: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CONFIG NOT FOUND: {0}")]
    NotFound(PathBuf),

    #[error("UNSUPPORTED PROVIDER: {0}")]
    UnsupportedProvider(String),

    #[error("NO API KEY FOR {provider}: set {variable} or pass --api-key")]
    MissingApiKey {
        provider: ProviderKind,
        variable: String,
    },

    #[error("INVALID VALUE FOR {name}: {value}")]
    InvalidValue { name: String, value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Environment variable selecting the provider
pub const PROVIDER_VAR: &str = "PARLEY_PROVIDER";
/// Environment variable bounding tool rounds per prompt
pub const MAX_TOOL_ROUNDS_VAR: &str = "PARLEY_MAX_TOOL_ROUNDS";
/// Environment variable pointing at the tool-server file
pub const MCP_CONFIG_VAR: &str = "PARLEY_MCP_CONFIG";

const DEFAULT_MAX_TOOL_ROUNDS: u32 = 5;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant with access to tools that \
fetch current information the model itself cannot know. Call a tool whenever it can answer \
the question better than you can. If no tool can help and you do not know the answer, say \
so plainly. Be direct and to the point.";

/// Completion endpoints speaking the OpenAI chat-completions dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    OpenRouter,
    Groq,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::OpenRouter,
        ProviderKind::Groq,
        ProviderKind::Ollama,
    ];

    /// Prefix of the provider's environment variables
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI",
            ProviderKind::OpenRouter => "OPENROUTER",
            ProviderKind::Groq => "GROQ",
            ProviderKind::Ollama => "OLLAMA",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::Ollama => "http://localhost:11434/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::OpenRouter => "anthropic/claude-sonnet-4",
            ProviderKind::Groq => "llama-3.3-70b-versatile",
            ProviderKind::Ollama => "llama3.1",
        }
    }

    /// Local endpoints accept any bearer token
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Groq => "groq",
            ProviderKind::Ollama => "ollama",
        }
    }
}

impl Default for ProviderKind {
    fn default() -> Self {
        ProviderKind::OpenAi
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnsupportedProvider(s.to_string()))
    }
}

/// Explicit values that win over the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tool_rounds: Option<u32>,
    pub tool_servers_path: Option<PathBuf>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub max_tool_rounds: u32,
    pub tool_servers_path: PathBuf,
}

impl Settings {
    /// Resolve from overrides and the process environment
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        Self::resolve_with(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve from overrides and an arbitrary variable lookup
    pub fn resolve_with<F>(overrides: Overrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let provider = match overrides.provider.or_else(|| var(PROVIDER_VAR)) {
            Some(name) => name.parse()?,
            None => ProviderKind::default(),
        };
        let prefix = provider.env_prefix();
        debug!("◆ RESOLVING SETTINGS FOR {}", provider);

        let key_var = format!("{}_API_KEY", prefix);
        let api_key = match overrides.api_key.or_else(|| var(&key_var)) {
            Some(key) => key,
            None if provider.requires_api_key() => {
                return Err(ConfigError::MissingApiKey {
                    provider,
                    variable: key_var,
                })
            }
            None => provider.as_str().to_string(),
        };

        let base_url = overrides
            .base_url
            .or_else(|| var(&format!("{}_BASE_URL", prefix)))
            .unwrap_or_else(|| provider.default_base_url().to_string());

        let model = overrides
            .model
            .or_else(|| var(&format!("{}_MODEL", prefix)))
            .unwrap_or_else(|| provider.default_model().to_string());

        let system_prompt = overrides
            .system_prompt
            .or_else(|| var(&format!("{}_SYSTEM_PROMPT", prefix)))
            .or_else(|| Some(DEFAULT_SYSTEM_PROMPT.to_string()))
            .filter(|prompt| !prompt.is_empty());

        let max_tool_rounds = match overrides.max_tool_rounds {
            Some(rounds) => rounds,
            None => match var(MAX_TOOL_ROUNDS_VAR) {
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    name: MAX_TOOL_ROUNDS_VAR.to_string(),
                    value: raw.clone(),
                })?,
                None => DEFAULT_MAX_TOOL_ROUNDS,
            },
        };

        let tool_servers_path = overrides
            .tool_servers_path
            .or_else(|| var(MCP_CONFIG_VAR).map(|p| paths::expand_home(&p)))
            .unwrap_or_else(tool_servers_path);

        Ok(Self {
            provider,
            api_key,
            base_url,
            model,
            system_prompt,
            max_tool_rounds,
            tool_servers_path,
        })
    }

    /// Built-in system prompt used when none is configured
    pub fn default_system_prompt() -> &'static str {
        DEFAULT_SYSTEM_PROMPT
    }
}

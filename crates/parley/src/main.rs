//! parley - streaming chat with tools

use clap::Parser;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

/// Chat with an LLM that can call local tools and MCP tool servers
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "◆ Streaming chat with tool calling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Send one message and exit instead of starting an interactive session
    pub message: Option<String>,

    /// API key (overrides {PROVIDER}_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Completion endpoint base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model name
    #[arg(short, long)]
    pub model: Option<String>,

    /// openai, openrouter, groq or ollama
    #[arg(short, long)]
    pub provider: Option<String>,

    /// System prompt; pass an empty string to send none
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Tool rounds per message before the model must answer in text
    #[arg(long)]
    pub max_tool_rounds: Option<u32>,

    /// Tool-server configuration file
    #[arg(long)]
    pub mcp_config: Option<PathBuf>,

    /// Do not register the built-in example tools
    #[arg(long)]
    pub no_builtin_tools: bool,

    /// Directory the file tools may read and write
    #[arg(long)]
    pub files_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            error!("◆ IGNORING .env: {}", e);
        }
    }

    if let Err(e) = commands::chat_command(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

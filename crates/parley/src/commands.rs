//! Chat command

use anyhow::{Context, Result};
use futures::StreamExt;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use parley_agent::tools::builtin;
use parley_agent::{AgentEvent, AgentLoop, Transcript};
use parley_config::{Overrides, Settings};
use parley_mcp::ToolServerManager;
use parley_provider::{OpenAiProvider, Provider};

use crate::Cli;

fn overrides(cli: &Cli) -> Overrides {
    Overrides {
        provider: cli.provider.clone(),
        api_key: cli.api_key.clone(),
        base_url: cli.base_url.clone(),
        model: cli.model.clone(),
        system_prompt: cli.system_prompt.clone(),
        max_tool_rounds: cli.max_tool_rounds,
        tool_servers_path: cli.mcp_config.clone(),
    }
}

/// Resolve settings, start tool servers and chat
pub async fn chat_command(cli: Cli) -> Result<()> {
    let settings = Settings::resolve(overrides(&cli)).context("◆ CONFIGURATION FAILED")?;
    info!(
        "◆ PROVIDER {} AT {} ({})",
        settings.provider, settings.base_url, settings.model
    );

    let provider = OpenAiProvider::new(
        settings.api_key.clone(),
        Some(settings.base_url.clone()),
        Some(settings.model.clone()),
    );

    let mut servers = ToolServerManager::new();
    servers.load_file(&settings.tool_servers_path).await;

    let mut builder = AgentLoop::builder(provider)
        .model(settings.model.clone())
        .system_prompt(settings.system_prompt.clone())
        .max_tool_rounds(settings.max_tool_rounds)
        .tool_servers(servers);

    if !cli.no_builtin_tools {
        let files_dir = cli.files_dir.clone().unwrap_or_else(parley_config::files_dir);
        let tools = builtin::default_tools(&files_dir).context("◆ BUILT-IN TOOLS MISCONFIGURED")?;
        builder = builder.tools(tools);
    }

    let mut agent = builder.build();
    debug!("◆ TOOLS: {}", agent.registry().names().join(", "));

    let outcome = match cli.message {
        Some(message) => {
            let mut transcript = Transcript::new();
            respond(&agent, &message, &mut transcript).await
        }
        None => interactive(&agent).await,
    };

    agent.shutdown().await;
    outcome
}

/// Stream one reply to stdout
async fn respond<P: Provider>(
    agent: &AgentLoop<P>,
    text: &str,
    transcript: &mut Transcript,
) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut events = agent.prompt_stream(text, &[], transcript, agent.max_tool_rounds());

    while let Some(event) = events.next().await {
        match event? {
            AgentEvent::Delta(fragment) => {
                print!("{}", fragment);
                stdout.flush()?;
            }
            AgentEvent::ToolCall {
                name, arguments, ..
            } => info!("◆ CALLING {} {}", name, arguments),
            AgentEvent::ToolResult {
                name,
                content,
                is_error,
                ..
            } => {
                if is_error {
                    warn!("◆ {} FAILED: {}", name, content);
                } else {
                    debug!("◆ {} RETURNED {} BYTES", name, content.len());
                }
            }
            AgentEvent::Finished(_) => println!(),
        }
    }

    Ok(())
}

/// Read-eval loop keeping one transcript. Ends on `exit`, `quit`,
/// end of input or Ctrl-C.
async fn interactive<P: Provider>(agent: &AgentLoop<P>) -> Result<()> {
    println!("◆ {} (type 'exit' to quit)", agent.model());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut transcript = Transcript::new();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let Some(line) = line else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        if let Err(e) = respond(agent, input, &mut transcript).await {
            println!();
            error!("{}", e);
        }
    }

    Ok(())
}

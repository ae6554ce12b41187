// Command-line front end for the agent bridge.
//
// Lists registered agents, probes their installation and streams one
// message exchange to stdout.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use agent_bridge::{
    AgentContext, ChatMessage, EventBus, LocalControlPlane, SendOptions, StopHandle, StreamEvent,
    registry,
};

/// Longest tool result echoed to the terminal in text mode
const TOOL_RESULT_PREVIEW: usize = 200;

#[derive(Debug, Parser)]
#[command(
    name = "agent-bridge",
    about = "Drive local coding-agent CLIs through one normalized event stream",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered agents grouped by provider.
    List,

    /// Probe whether an agent CLI is installed.
    Status {
        /// Agent id, e.g. `claude-code`.
        agent: String,
    },

    /// Send one prompt and stream the normalized events.
    Send {
        /// Agent id, e.g. `claude-code`.
        agent: String,
        /// Prompt text.
        prompt: String,
        /// Working directory for the agent.
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Model override passed to the agent CLI.
        #[arg(long, env = "AGENT_BRIDGE_MODEL")]
        model: Option<String>,
        /// Print each event as one JSON line.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let bus = EventBus::new();
    let ctx = AgentContext::new(Arc::new(LocalControlPlane::new(bus.clone())), bus);

    match cli.command {
        Command::List => list_agents(),
        Command::Status { agent } => print_status(&ctx, &agent).await?,
        Command::Send {
            agent,
            prompt,
            cwd,
            model,
            json,
        } => send(&ctx, &agent, prompt, cwd, model, json).await?,
    }

    Ok(())
}

fn list_agents() {
    for (provider, entries) in registry::agents_by_provider() {
        println!("{provider}");
        for entry in entries {
            let config = entry.config;
            println!("  {:<14} {} - {}", config.id, config.name, config.description);
        }
    }
}

async fn print_status(ctx: &AgentContext, agent: &str) -> Result<()> {
    let adapter = registry::get_adapter(agent)?;
    let status = adapter.check_status(ctx).await?;

    println!("{agent}");
    println!("  installed:     {}", status.installed);
    if let Some(path) = &status.binary_path {
        println!("  binary:        {}", path.display());
    }
    if let Some(version) = &status.version {
        println!("  version:       {version}");
    }
    let authenticated = status
        .authenticated
        .map_or_else(|| "unknown".to_string(), |auth| auth.to_string());
    println!("  authenticated: {authenticated}");
    if let Some(error) = &status.error {
        println!("  error:         {error}");
    }
    Ok(())
}

async fn send(
    ctx: &AgentContext,
    agent: &str,
    prompt: String,
    cwd: Option<PathBuf>,
    model: Option<String>,
    json: bool,
) -> Result<()> {
    let adapter = registry::get_adapter(agent)?;

    let stop = StopHandle::new();
    let ctrl_c = {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Stopping after Ctrl-C");
                stop.stop();
            }
        })
    };

    let mut builder = SendOptions::builder().stop_handle(stop);
    if let Some(cwd) = cwd {
        builder = builder.working_directory(cwd);
    }
    if let Some(model) = model {
        builder = builder.model(model);
    }

    let history = [ChatMessage::user(prompt)];
    let mut streamed_text = false;
    let mut on_stream = |event: StreamEvent| {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => log::warn!("Failed to encode event: {e}"),
            }
            return;
        }
        match event {
            StreamEvent::Text { content } => {
                streamed_text = true;
                print!("{content}");
                let _ = std::io::stdout().flush();
            }
            StreamEvent::Thinking { content } => eprint!("{content}"),
            StreamEvent::ToolUse { tool_name, .. } => eprintln!("\n[tool] {tool_name}"),
            StreamEvent::ToolResult { result, .. } => {
                let preview: String = result.chars().take(TOOL_RESULT_PREVIEW).collect();
                eprintln!("[tool result] {preview}");
            }
            StreamEvent::Error { message } => eprintln!("[error] {message}"),
            StreamEvent::Done => {}
        }
    };

    let result = adapter
        .send_message(ctx, &history, builder.build(), &mut on_stream)
        .await;
    ctrl_c.abort();
    let outcome = result?;

    if !json && !streamed_text && !outcome.text.is_empty() {
        print!("{}", outcome.text);
    }
    if outcome.stopped {
        println!("\n[stopped]");
    } else if !json {
        println!();
    }
    Ok(())
}

//! auroractl - terminal client for an Aurora server
//!
//! Streams agent replies through the proxy the same way the web chat does,
//! and provides a couple of quick checks against a running server.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use aurora_stream::{AgentKind, ApiClient, ChatStream, ExchangeOutcome};
use clap::{Parser, Subcommand};
use serde_json::Value;

const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "Error: {err:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn try_main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Chat { agent, message } => {
            handle_chat(&cli.server, agent, &message.join(" "), cli.json).await
        }
        Command::Agents { remote } => handle_agents(&cli.server, remote, cli.json).await,
        Command::Health => handle_health(&cli.server, cli.json).await,
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "auroractl",
    author,
    version,
    about = "Terminal client for Aurora - chat with agents through the proxy."
)]
struct Cli {
    /// Aurora server URL
    #[arg(long, short = 's', default_value = DEFAULT_SERVER_URL, env = "AURORA_SERVER_URL")]
    server: String,

    /// Output machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a message to an agent and stream the reply
    ///
    /// Press Ctrl+C to stop the reply early.
    Chat {
        /// Agent to talk to (welcome, skillnav, progress)
        agent: AgentKind,

        /// Message text
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },

    /// List the chat agents
    Agents {
        /// Ask the backend for its agent list instead of the built-in catalog
        #[arg(long)]
        remote: bool,
    },

    /// Check server health
    Health,
}

async fn handle_chat(server: &str, agent: AgentKind, message: &str, json: bool) -> Result<()> {
    let stream = ChatStream::new(&agent.stream_url(server)).context("creating chat stream")?;
    let mut updates = stream.subscribe();
    let mut stdout = io::stdout();
    let mut printed = 0;

    let exchange = stream.send(message);
    tokio::pin!(exchange);

    let outcome = loop {
        tokio::select! {
            outcome = &mut exchange => break outcome,
            changed = updates.changed() => {
                if changed.is_err() {
                    continue;
                }
                let output = updates.borrow_and_update().output.clone();
                if !json {
                    print_delta(&mut stdout, &output, &mut printed)?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                stream.stop();
            }
        }
    };

    let snapshot = stream.snapshot();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("serializing chat result")?
        );
    } else {
        print_delta(&mut stdout, &snapshot.output, &mut printed)?;
        if printed > 0 {
            writeln!(stdout)?;
        }
    }

    match outcome {
        ExchangeOutcome::Completed => Ok(()),
        ExchangeOutcome::Cancelled => {
            eprintln!("(stopped)");
            Ok(())
        }
        ExchangeOutcome::Failed(message) => Err(anyhow!(message)),
        ExchangeOutcome::Ignored => Err(anyhow!("message is empty")),
    }
}

/// Write whatever `output` gained since the last call.
fn print_delta(stdout: &mut io::Stdout, output: &str, printed: &mut usize) -> Result<()> {
    if output.len() > *printed {
        stdout.write_all(output[*printed..].as_bytes())?;
        stdout.flush()?;
        *printed = output.len();
    }
    Ok(())
}

async fn handle_agents(server: &str, remote: bool, json: bool) -> Result<()> {
    if remote {
        let client = ApiClient::new(server).context("creating API client")?;
        let agents: Value = client
            .get_json("/v1/agents")
            .await
            .context("fetching agents from backend")?;
        println!("{}", serde_json::to_string_pretty(&agents)?);
        return Ok(());
    }

    if json {
        let agents: Vec<Value> = AgentKind::ALL
            .iter()
            .map(|agent| {
                serde_json::json!({
                    "agent": agent,
                    "title": agent.title(),
                    "stream_path": agent.stream_path(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&agents)?);
    } else {
        for agent in AgentKind::ALL {
            println!("{:<10} {:<20} {}", agent.slug(), agent.title(), agent.stream_path());
        }
    }
    Ok(())
}

async fn handle_health(server: &str, json: bool) -> Result<()> {
    let url = format!("{}/api/health", server.trim_end_matches('/'));
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("connecting to {url}"))?;

    let status = response.status();
    let body: Value = response.json().await.context("reading health response")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!(
            "{} ({}) version {}",
            body.get("status").and_then(Value::as_str).unwrap_or("unknown"),
            status,
            body.get("version").and_then(Value::as_str).unwrap_or("?")
        );
    }

    if status.is_success() {
        Ok(())
    } else {
        Err(anyhow!("server reported {status}"))
    }
}

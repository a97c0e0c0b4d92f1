//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the
//! appropriate commands.

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::core::constants::INSTALL_GUIDANCE;
use crate::core::qwen::QwenClient;
use crate::mcp::server::McpServer;
use crate::utils::file_reference;

#[derive(Parser)]
#[command(name = "qwen-mcp")]
#[command(about = "An MCP stdio server bridging tool calls to the Qwen Code CLI")]
#[command(
    long_about = "qwen-mcp exposes the locally installed Qwen Code CLI as a set of \
Model Context Protocol tools over stdio. Connect it to any MCP client and call \
ask-qwen to delegate prompts; @path references in a prompt inline file or \
directory contents.\n\n\
Environment Variables:\n\
  QWEN_API_KEY      Forwarded to the CLI process (optional; the CLI normally\n\
                    relies on its own local authentication)\n\
  RUST_LOG          Log filter, written to stderr (e.g. qwen_mcp=debug)\n\n\
Configuration:\n\
  An optional config.toml in the platform config directory can override the\n\
  binary name, model label, timeout, attempt budget, and retry delay."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the MCP server on stdio (default)
    Serve,
    /// Probe whether the Qwen CLI is installed and reachable
    Check,
    /// Send a one-shot prompt through the managed client
    Ask {
        /// Prompt text; @path references resolve against the current directory
        prompt: String,
        /// Extra context prepended to the prompt
        #[arg(short, long)]
        context: Option<String>,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

fn init_tracing() {
    // stdout carries the protocol; all diagnostics go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load()?;

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => McpServer::new(config).run().await.map_err(Into::into),
        Commands::Check => {
            let client = client_from(&config);
            if client.check_available().await {
                println!("qwen CLI is available");
                Ok(())
            } else {
                eprintln!("{INSTALL_GUIDANCE}");
                std::process::exit(1);
            }
        }
        Commands::Ask { prompt, context } => {
            let client = client_from(&config);
            let base_dir = std::env::current_dir()?;
            let resolved = file_reference::resolve_file_references(&prompt, &base_dir);
            let response = client.ask(&resolved, context.as_deref()).await;
            match response.error {
                None => {
                    println!("{}", response.content);
                    Ok(())
                }
                Some(error) => {
                    eprintln!("{error}");
                    std::process::exit(1);
                }
            }
        }
    }
}

fn client_from(config: &Config) -> QwenClient {
    let api_key = std::env::var("QWEN_API_KEY").ok();
    QwenClient::new(config.client_config(api_key))
}

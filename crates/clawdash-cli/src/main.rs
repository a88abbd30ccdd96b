//! clawdash: terminal front end for a messaging gateway.
//!
//! Connects to the gateway over WebSocket, authenticates, and lets the
//! operator watch channel status and conversation traffic or send messages.

mod commands;
mod config;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

/// clawdash: messaging gateway client
#[derive(Parser)]
#[command(name = "clawdash", version, about = "Watch and drive a messaging gateway from the terminal")]
struct Cli {
    /// Gateway WebSocket URL
    #[arg(short, long, global = true)]
    gateway: Option<String>,

    /// Auth token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Default peer address for sends
    #[arg(long, global = true)]
    peer: Option<String>,

    /// Config file path
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Follow status and messages (default)
    Watch,

    /// Send one message
    Send {
        /// Recipient (defaults to the configured peer)
        #[arg(long)]
        to: Option<String>,

        /// Message text
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Interactive chat with the configured peer
    Chat,

    /// Show the effective configuration
    Config {
        /// Write the merged configuration back to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing.
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("clawdash=debug,clawdash_cli=debug,clawdash_client=debug,clawdash_core=debug")
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("clawdash=warn,clawdash_cli=warn,clawdash_client=warn,clawdash_core=warn")
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    // Load config file; CLI flags override it.
    let config_path = cli.config.clone().unwrap_or_else(config::Config::default_path);
    let cfg = match config::Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("clawdash: {e:#}");
            std::process::exit(1);
        }
    }
    .merge(config::Overrides {
        gateway: cli.gateway.clone(),
        token: cli.token.clone(),
        peer: cli.peer.clone(),
    });

    let result = match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => commands::watch::run(&cfg).await,
        Command::Send { to, text } => {
            commands::send::run(&cfg, to.as_deref(), &text.join(" ")).await
        }
        Command::Chat => commands::chat::run(&cfg).await,
        Command::Config { save } => commands::config::run(&cfg, &config_path, save),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("clawdash: {e:#}");
        std::process::exit(1);
    }
}

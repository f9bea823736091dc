//! Tether - offline-first client for a remote coding-session backend
//!
//! Main entry point for the tether CLI.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

mod commands;

use commands::{attach, cache, delete, events, messages, new, rename, sessions};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Tether - offline-first client for a remote coding-session backend
#[derive(Parser)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL (default: http://127.0.0.1:4096)
    #[arg(long, global = true, env = "TETHER_SERVER_URL")]
    pub server: Option<String>,

    /// Working directory sent with directory-scoped calls
    #[arg(long, global = true, env = "TETHER_DIRECTORY")]
    pub directory: Option<String>,

    /// Treat the network as unavailable and answer from the cache
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List sessions
    Sessions(sessions::SessionsArgs),

    /// Show the messages of a session
    Messages(messages::MessagesArgs),

    /// Create a session
    New(new::NewArgs),

    /// Rename a session
    Rename(rename::RenameArgs),

    /// Delete a session
    Delete(delete::DeleteArgs),

    /// Attach to a terminal session
    Attach(attach::AttachArgs),

    /// Follow live events of a session
    Events(events::EventsArgs),

    /// Offline cache maintenance
    Cache(cache::CacheArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing: console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "tether=debug,tether_client=debug,tether_stream=debug,tether_cache=debug,tether_sync=debug,tether_config=debug,info"
    } else {
        "tether=info,tether_client=info,tether_stream=info,tether_cache=warn,tether_sync=warn,warn"
    };

    let log_dir = tether_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "tether.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "tether=trace,tether_client=trace,tether_stream=trace,tether_cache=trace,tether_sync=trace,tether_config=trace,info",
                )),
        )
        .init();

    // Load configuration, then let flags override it
    let loaded = tether_config::load_config(None).context("Failed to load configuration")?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    let mut config = loaded.config;
    if let Some(server) = cli.server {
        config.server.url = Some(server);
    }
    if let Some(directory) = cli.directory {
        config.server.directory = Some(directory);
    }

    // Create context for commands
    let ctx = commands::Context {
        config,
        data_dir: tether_config::data_dir(),
        json_output: cli.json,
        verbose: cli.verbose,
        offline: cli.offline,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Sessions(args) => sessions::run(args, &ctx).await,
        Commands::Messages(args) => messages::run(args, &ctx).await,
        Commands::New(args) => new::run(args, &ctx).await,
        Commands::Rename(args) => rename::run(args, &ctx).await,
        Commands::Delete(args) => delete::run(args, &ctx).await,
        Commands::Attach(args) => attach::run(args, &ctx).await,
        Commands::Events(args) => events::run(args, &ctx).await,
        Commands::Cache(args) => cache::run(args, &ctx).await,
    }
}

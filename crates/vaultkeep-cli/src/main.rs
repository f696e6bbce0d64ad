//! VaultKeep CLI - Command-line interface for VaultKeep
//!
//! Provides commands for:
//! - Running a full reconciliation pass
//! - Pruning remote version chains
//! - Watching the vault and syncing continuously
//! - Inspecting configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    config::ConfigCommand, gc::GcCommand, sync::SyncCommand, watch::WatchCommand,
};
use output::OutputFormat;
use vaultkeep_core::config::Config;

#[derive(Debug, Parser)]
#[command(name = "vaultkeep", version, about = "Versioned vault synchronization")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one full reconciliation pass
    Sync(SyncCommand),
    /// Prune old remote versions
    Gc(GcCommand),
    /// Watch the vault and sync continuously
    Watch(WatchCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    // Verbosity flags override the configured level.
    let filter = match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(format, &config).await,
        Commands::Gc(cmd) => cmd.execute(format, &config).await,
        Commands::Watch(cmd) => cmd.execute(format, &config).await,
        Commands::Config(cmd) => cmd.execute(format, &config, &config_path).await,
    }
}

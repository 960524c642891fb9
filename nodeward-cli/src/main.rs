//! Nodeward CLI - Command-line interface
//!
//! This binary drives the nodeward library: it runs a node and relays
//! console commands to it, installs client binaries, and checks for new
//! client releases.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod error;

use commands::config::ConfigCommands;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "nodeward")]
#[command(version = nodeward::VERSION)]
#[command(about = "Install, update, and run embedded blockchain nodes", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.nodeward/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the configured node and accept commands on stdin
    Run(RunArgs),

    /// Check for a newer client release and update the catalog
    CheckUpdate {
        /// Client id in the catalog (e.g. "bith")
        client: String,
    },

    /// Download and verify the binary for a client
    Install {
        /// Client id in the catalog (e.g. "bith")
        client: String,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(config, args).await,
        Commands::CheckUpdate { client } => commands::update::run(config, &client).await,
        Commands::Install { client } => commands::install::run(config, &client).await,
        Commands::Config { command } => commands::config::run(config, command),
    };

    if let Err(e) = result {
        e.exit();
    }
}

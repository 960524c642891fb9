//! Configuration management CLI commands.
//!
//! Provides `config init`, `config show`, and `config path`.

use std::path::Path;

use clap::Subcommand;
use nodeward::config::{config_file_path, ConfigFile};

use crate::commands::common::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file if none exists
    Init {
        /// Overwrite an existing file with defaults
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(config_path: Option<&Path>, command: ConfigCommands) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);

    match command {
        ConfigCommands::Init { force } => run_init(&path, force),
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        println!("Configuration already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn run_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;

    println!("[node]");
    println!("  client           = {}", config.node.client);
    println!("  network          = {}", config.node.network);
    println!("  sync_mode        = {}", config.node.sync_mode);
    println!("  data_dir         = {}", config.node.data_dir.display());
    println!("  rpc_port         = {}", config.node.rpc_port);
    println!("  ready_timeout    = {}s", config.node.ready_timeout);
    println!("  shutdown_timeout = {}s", config.node.shutdown_timeout);
    println!(
        "  log_file         = {}",
        config.controller_config().log_file.display()
    );
    println!();
    println!("[binaries]");
    println!("  manifest         = {}", config.binaries.manifest.display());
    println!("  install_dir      = {}", config.binaries.install_dir.display());
    println!("  sanity_timeout   = {}s", config.binaries.sanity_timeout);
    println!();
    println!("[updates]");
    println!("  release_url      = {}", config.updates.release_url);
    println!("  commit_url       = {}", config.updates.commit_url);
    if config.updates.listing_url.is_empty() {
        println!("  listing_url      = (not set)");
    } else {
        println!("  listing_url      = {}", config.updates.listing_url);
    }
    println!("  timeout          = {}s", config.updates.timeout);
    println!();
    println!("[rpc]");
    println!("  timeout          = {}s", config.rpc.timeout);
    println!();
    println!("[logging]");
    println!("  file             = {}", config.logging.file.display());

    Ok(())
}

//! `nodeward run`: start the configured node and drive it from stdin.
//!
//! Each console line is one request to the orchestrator. Requests run in the
//! background so a new `switch` can supersede one still starting.

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use nodeward::node::{Network, NodeSnapshot, NodeStatus, RestartOutcome, SyncMode};
use nodeward::orchestration::{NodeOrchestrator, OrchestrationResult};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::commands::common::{load_config, start_logging, Components};
use crate::commands::update::print_result;
use crate::error::CliError;

/// Arguments for `nodeward run`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Client to start (default: from config)
    #[arg(long)]
    pub client: Option<String>,

    /// Network: main, test, rinkeby, or dev (default: from config)
    #[arg(long)]
    pub network: Option<Network>,

    /// Sync mode: fast, light, or full (default: from config)
    #[arg(long)]
    pub sync_mode: Option<SyncMode>,

    /// Do not start a node until asked to
    #[arg(long)]
    pub no_start: bool,
}

/// One line typed at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Switch {
        client: String,
        network: Option<Network>,
        sync_mode: Option<SyncMode>,
    },
    Network(Network),
    Sync(SyncMode),
    Mine,
    Status,
    Update(Option<String>),
    Stop,
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  switch <client> [network] [sync]   run a client (keeps unspecified settings)
  network <main|test|rinkeby|dev>    switch network, same client
  sync <fast|light|full>             switch sync mode, same client
  mine                               toggle mining (test and dev only)
  update [client]                    check for a newer client release
  status                             show the node state
  stop                               stop the node
  quit                               stop the node and exit";

/// Parse a console line. Blank lines yield `None`.
fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match (verb.to_lowercase().as_str(), rest.as_slice()) {
        ("switch", [client, options @ ..]) => {
            let mut network = None;
            let mut sync_mode = None;
            for option in options {
                if let Ok(n) = option.parse::<Network>() {
                    network = Some(n);
                } else if let Ok(m) = option.parse::<SyncMode>() {
                    sync_mode = Some(m);
                } else {
                    return Err(format!("'{}' is neither a network nor a sync mode", option));
                }
            }
            ConsoleCommand::Switch {
                client: client.to_string(),
                network,
                sync_mode,
            }
        }
        ("switch", []) => return Err("usage: switch <client> [network] [sync]".to_string()),
        ("network", [name]) => ConsoleCommand::Network(name.parse()?),
        ("sync", [mode]) => ConsoleCommand::Sync(mode.parse()?),
        ("mine", []) => ConsoleCommand::Mine,
        ("update", []) => ConsoleCommand::Update(None),
        ("update", [client]) => ConsoleCommand::Update(Some(client.to_string())),
        ("status", []) => ConsoleCommand::Status,
        ("stop", []) => ConsoleCommand::Stop,
        ("help" | "?", _) => ConsoleCommand::Help,
        ("quit" | "exit", []) => ConsoleCommand::Quit,
        (other, _) => {
            return Err(format!(
                "unknown command '{}' (type 'help' for a list)",
                other
            ))
        }
    };
    Ok(Some(command))
}

/// Run the console until `quit`, end of input, or Ctrl-C.
pub async fn run(config_path: Option<&Path>, args: RunArgs) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let _logging = start_logging(&config)?;
    let orchestrator = Arc::new(Components::build(&config)?.into_orchestrator());
    let printer = spawn_status_printer(orchestrator.subscribe());
    info!(
        version = nodeward::VERSION,
        manifest = %config.binaries.manifest.display(),
        "Console started"
    );

    if !args.no_start {
        let client = args.client.unwrap_or_else(|| config.node.client.clone());
        dispatch(
            &orchestrator,
            ConsoleCommand::Switch {
                client,
                network: args.network,
                sync_mode: args.sync_mode,
            },
        );
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.map_err(CliError::Console)?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(command)) => dispatch(&orchestrator, command),
            Err(message) => println!("{}", message),
        }
    }

    println!("Shutting down...");
    info!("Console closed");
    printer.abort();
    orchestrator.shutdown().await?;
    Ok(())
}

/// Hand a command to the orchestrator without blocking the console.
fn dispatch(orchestrator: &Arc<NodeOrchestrator>, command: ConsoleCommand) {
    let orchestrator = orchestrator.clone();
    match command {
        ConsoleCommand::Switch {
            client,
            network,
            sync_mode,
        } => {
            tokio::spawn(async move {
                report_switch(orchestrator.switch_node(&client, network, sync_mode).await);
            });
        }
        ConsoleCommand::Network(network) => {
            tokio::spawn(async move {
                let client = orchestrator.desired_config().client_type;
                report_switch(orchestrator.switch_node(&client, Some(network), None).await);
            });
        }
        ConsoleCommand::Sync(sync_mode) => {
            tokio::spawn(async move {
                let client = orchestrator.desired_config().client_type;
                report_switch(orchestrator.switch_node(&client, None, Some(sync_mode)).await);
            });
        }
        ConsoleCommand::Mine => {
            tokio::spawn(async move {
                match orchestrator.toggle_mining().await {
                    Ok(state) => println!("Mining is {}", state),
                    Err(e) => println!("Mining toggle failed: {}", e),
                }
            });
        }
        ConsoleCommand::Update(client) => {
            tokio::spawn(async move {
                let client = client.unwrap_or_else(|| orchestrator.desired_config().client_type);
                match orchestrator.check_for_node_update(&client).await {
                    Ok(result) => print_result(&result),
                    Err(e) => println!("Update check failed: {}", e),
                }
            });
        }
        ConsoleCommand::Stop => {
            tokio::spawn(async move {
                if let Err(e) = orchestrator.stop().await {
                    println!("Stop failed: {}", e);
                }
            });
        }
        ConsoleCommand::Status => print_status(&orchestrator),
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => {}
    }
}

fn report_switch(result: OrchestrationResult<RestartOutcome>) {
    match result {
        Ok(outcome) if outcome.was_started() => {}
        Ok(outcome) => println!("Already running {}", outcome.state().config),
        Err(e) if e.is_superseded() => println!("Switch superseded by a newer request"),
        Err(e) => println!("Switch failed: {}", e),
    }
}

fn print_status(orchestrator: &NodeOrchestrator) {
    let snapshot = orchestrator.status();
    println!("{}", describe(&snapshot));
    println!("  requested: {}", orchestrator.desired_config());
    println!("  mining:    {}", orchestrator.mining());
    if let Some(node) = &snapshot.node {
        println!("  binary:    {}", node.binary.display());
        println!("  endpoint:  {}", node.endpoint);
        println!("  started:   {}", node.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
}

/// One-line summary of a snapshot.
fn describe(snapshot: &NodeSnapshot) -> String {
    match (&snapshot.node, snapshot.status) {
        (Some(node), NodeStatus::Running) => match node.pid {
            Some(pid) => format!("Node running: {} (pid {})", node.config, pid),
            None => format!("Node running: {}", node.config),
        },
        (_, NodeStatus::Failed) => format!(
            "Node failed: {}",
            snapshot.last_error.as_deref().unwrap_or("unknown error")
        ),
        (_, status) => format!("Node {}", status),
    }
}

/// Print every status transition as it happens.
fn spawn_status_printer(mut rx: watch::Receiver<NodeSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = rx.borrow().status;
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            if snapshot.status != last {
                last = snapshot.status;
                println!("{}", describe(&snapshot));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_switch_in_any_order() {
        assert_eq!(
            parse_line("switch Bith full rinkeby").unwrap(),
            Some(ConsoleCommand::Switch {
                client: "Bith".to_string(),
                network: Some(Network::Rinkeby),
                sync_mode: Some(SyncMode::Full),
            })
        );
        assert_eq!(
            parse_line("  switch bith  ").unwrap(),
            Some(ConsoleCommand::Switch {
                client: "bith".to_string(),
                network: None,
                sync_mode: None,
            })
        );
    }

    #[test]
    fn test_parse_switch_rejects_unknown_option() {
        assert!(parse_line("switch bith kovan").is_err());
        assert!(parse_line("switch").is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_line("MINE").unwrap(), Some(ConsoleCommand::Mine));
        assert_eq!(parse_line("status").unwrap(), Some(ConsoleCommand::Status));
        assert_eq!(parse_line("exit").unwrap(), Some(ConsoleCommand::Quit));
        assert_eq!(
            parse_line("network testnet").unwrap(),
            Some(ConsoleCommand::Network(Network::Test))
        );
        assert_eq!(
            parse_line("sync light").unwrap(),
            Some(ConsoleCommand::Sync(SyncMode::Light))
        );
        assert_eq!(
            parse_line("update bith").unwrap(),
            Some(ConsoleCommand::Update(Some("bith".to_string())))
        );
    }

    #[test]
    fn test_parse_blank_and_unknown() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert!(parse_line("mine now").is_err());
        assert!(parse_line("reboot").unwrap_err().contains("reboot"));
    }

    #[test]
    fn test_describe_failed_snapshot() {
        let snapshot = NodeSnapshot {
            status: NodeStatus::Failed,
            node: None,
            last_error: Some("Node not ready after 30s".to_string()),
        };
        assert_eq!(describe(&snapshot), "Node failed: Node not ready after 30s");
        assert_eq!(describe(&NodeSnapshot::default()), "Node stopped");
    }
}

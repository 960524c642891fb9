//! Node command-line construction.

use std::path::Path;

use super::types::{Network, NodeConfig};

/// HTTP APIs exposed to the manager.
const HTTP_APIS: &str = "eth,net,web3,miner";

/// Flags for running `config` with its chain data under `data_dir/<network>`
/// and JSON-RPC on `127.0.0.1:rpc_port`.
pub fn node_args(config: &NodeConfig, data_dir: &Path, rpc_port: u16) -> Vec<String> {
    let mut args = Vec::new();

    match config.network {
        Network::Main => {}
        Network::Test => args.push("--testnet".to_string()),
        Network::Rinkeby => args.push("--rinkeby".to_string()),
        Network::Dev => args.push("--dev".to_string()),
    }

    args.push("--syncmode".to_string());
    args.push(config.sync_mode.as_str().to_string());

    args.push("--datadir".to_string());
    args.push(
        data_dir
            .join(config.network.as_str())
            .to_string_lossy()
            .into_owned(),
    );

    let port = rpc_port.to_string();
    for flag in [
        "--http",
        "--http.addr",
        "127.0.0.1",
        "--http.port",
        port.as_str(),
        "--http.api",
        HTTP_APIS,
    ] {
        args.push(flag.to_string());
    }

    args
}

/// Local JSON-RPC endpoint of a node started with [`node_args`].
pub fn rpc_endpoint(rpc_port: u16) -> String {
    format!("http://127.0.0.1:{}", rpc_port)
}

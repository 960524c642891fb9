//! Default values for all configuration settings.

use super::file::config_directory;
use super::settings::*;
use crate::node::{Network, SyncMode};

/// Client started when none is configured.
pub const DEFAULT_CLIENT: &str = "bith";

pub const DEFAULT_RPC_PORT: u16 = 8545;

pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_SANITY_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_UPDATE_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_RELEASE_URL: &str =
    "https://api.github.com/repos/bitherhq/go-bither/releases/latest";

pub const DEFAULT_COMMIT_URL: &str = "https://api.github.com/repos/bitherhq/go-bither/commits/{tag}";

/// File name of the binary catalog inside the config directory.
pub const MANIFEST_FILE_NAME: &str = "clientBinaries.json";

impl Default for ConfigFile {
    fn default() -> Self {
        let base = config_directory();
        Self {
            node: NodeSettings {
                client: DEFAULT_CLIENT.to_string(),
                network: Network::Main,
                sync_mode: SyncMode::Fast,
                data_dir: base.join("data"),
                rpc_port: DEFAULT_RPC_PORT,
                ready_timeout: DEFAULT_READY_TIMEOUT_SECS,
                shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                log_file: None,
            },
            binaries: BinariesSettings {
                manifest: base.join(MANIFEST_FILE_NAME),
                install_dir: base.join("binaries"),
                sanity_timeout: DEFAULT_SANITY_TIMEOUT_SECS,
            },
            updates: UpdatesSettings {
                release_url: DEFAULT_RELEASE_URL.to_string(),
                commit_url: DEFAULT_COMMIT_URL.to_string(),
                listing_url: String::new(),
                timeout: DEFAULT_UPDATE_TIMEOUT_SECS,
            },
            rpc: RpcSettings {
                timeout: DEFAULT_RPC_TIMEOUT_SECS,
            },
            logging: LoggingSettings {
                file: base.join("nodeward.log"),
            },
        }
    }
}

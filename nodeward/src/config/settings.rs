//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;
use std::time::Duration;

use crate::acquire::AcquirerConfig;
use crate::node::{ControllerConfig, Network, NodeConfig, SyncMode, DEFAULT_PROBE_INTERVAL};
use crate::rpc::RpcConfig;
use crate::updater::FeedConfig;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub node: NodeSettings,
    pub binaries: BinariesSettings,
    pub updates: UpdatesSettings,
    pub rpc: RpcSettings,
    pub logging: LoggingSettings,
}

/// `[node]`: which node to run and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSettings {
    /// Client id in the binary catalog.
    pub client: String,
    pub network: Network,
    pub sync_mode: SyncMode,
    /// Chain data root; each network uses a subdirectory.
    pub data_dir: PathBuf,
    pub rpc_port: u16,
    /// Seconds a new node has to become ready.
    pub ready_timeout: u64,
    /// Seconds a node has to exit before it is killed.
    pub shutdown_timeout: u64,
    /// Node stdout/stderr. Defaults to `<data_dir>/node.log`.
    pub log_file: Option<PathBuf>,
}

/// `[binaries]`: catalog and install locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinariesSettings {
    pub manifest: PathBuf,
    pub install_dir: PathBuf,
    /// Seconds the post-install sanity command may take.
    pub sanity_timeout: u64,
}

/// `[updates]`: release feed endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatesSettings {
    pub release_url: String,
    /// May contain `{tag}`.
    pub commit_url: String,
    pub listing_url: String,
    /// HTTP timeout in seconds.
    pub timeout: u64,
}

/// `[rpc]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcSettings {
    /// Per-call timeout in seconds.
    pub timeout: u64,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub file: PathBuf,
}

impl ConfigFile {
    /// The node configuration to start with.
    pub fn node_config(&self) -> NodeConfig {
        NodeConfig::new(&self.node.client, self.node.network, self.node.sync_mode)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            data_dir: self.node.data_dir.clone(),
            rpc_port: self.node.rpc_port,
            ready_timeout: Duration::from_secs(self.node.ready_timeout),
            shutdown_timeout: Duration::from_secs(self.node.shutdown_timeout),
            probe_interval: DEFAULT_PROBE_INTERVAL,
            log_file: self
                .node
                .log_file
                .clone()
                .unwrap_or_else(|| self.node.data_dir.join("node.log")),
        }
    }

    pub fn acquirer_config(&self) -> AcquirerConfig {
        AcquirerConfig {
            install_dir: self.binaries.install_dir.clone(),
            sanity_timeout: Duration::from_secs(self.binaries.sanity_timeout),
            target: None,
        }
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            release_url: self.updates.release_url.clone(),
            commit_url: self.updates.commit_url.clone(),
            listing_url: self.updates.listing_url.clone(),
            timeout: Duration::from_secs(self.updates.timeout),
        }
    }

    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            timeout: Duration::from_secs(self.rpc.timeout),
        }
    }
}

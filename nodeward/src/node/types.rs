//! Node configuration and lifecycle state.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::error::{NodeError, NodeResult};
use crate::rpc::InstanceId;

/// Chain the node joins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Network {
    #[default]
    Main,
    /// Public proof-of-work test network.
    Test,
    Rinkeby,
    /// Single-node development chain.
    Dev,
}

impl Network {
    pub const ALL: [Network; 4] = [Self::Main, Self::Test, Self::Rinkeby, Self::Dev];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Test => "test",
            Self::Rinkeby => "rinkeby",
            Self::Dev => "dev",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Main => "Main Network",
            Self::Test => "Ropsten - Test Network",
            Self::Rinkeby => "Rinkeby - Test Network",
            Self::Dev => "Solo network",
        }
    }

    /// Whether mining can be toggled on this network.
    pub fn supports_mining(&self) -> bool {
        matches!(self, Self::Test | Self::Dev)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" | "mainnet" => Ok(Self::Main),
            "test" | "testnet" | "ropsten" => Ok(Self::Test),
            "rinkeby" => Ok(Self::Rinkeby),
            "dev" | "solo" => Ok(Self::Dev),
            other => Err(format!(
                "unknown network '{}' (expected main, test, rinkeby or dev)",
                other
            )),
        }
    }
}

/// Chain synchronisation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SyncMode {
    #[default]
    Fast,
    Light,
    Full,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Light => "light",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "light" => Ok(Self::Light),
            "full" => Ok(Self::Full),
            other => Err(format!(
                "unknown sync mode '{}' (expected fast, light or full)",
                other
            )),
        }
    }
}

/// The desired running configuration. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeConfig {
    /// Catalog client id, lower-cased.
    pub client_type: String,
    pub network: Network,
    pub sync_mode: SyncMode,
}

impl NodeConfig {
    pub fn new(client_type: impl AsRef<str>, network: Network, sync_mode: SyncMode) -> Self {
        Self {
            client_type: client_type.as_ref().trim().to_lowercase(),
            network,
            sync_mode,
        }
    }

    /// Reject combinations the node cannot run.
    pub fn validate(&self) -> NodeResult<()> {
        if self.client_type.is_empty() {
            return Err(NodeError::InvalidConfig("client type is empty".to_string()));
        }
        if self.network == Network::Dev && self.sync_mode == SyncMode::Light {
            return Err(NodeError::InvalidConfig(
                "light sync is not available on the dev network".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} ({} sync)", self.client_type, self.network, self.sync_mode)
    }
}

/// Lifecycle phase of the managed node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A started node process.
///
/// Built once per successful start and replaced, not mutated, afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningNodeState {
    pub config: NodeConfig,
    pub status: NodeStatus,
    pub instance: InstanceId,
    pub pid: Option<u32>,
    pub binary: PathBuf,
    pub endpoint: String,
    pub started_at: DateTime<Utc>,
}

impl RunningNodeState {
    pub(crate) fn with_status(&self, status: NodeStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// What subscribers of the controller see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub status: NodeStatus,
    /// The current or most recent process, if it was ever started.
    pub node: Option<RunningNodeState>,
    /// Error of the last failed restart, cleared by the next success.
    pub last_error: Option<String>,
}

impl NodeSnapshot {
    /// Config of the process that is up, if any.
    pub fn running_config(&self) -> Option<&NodeConfig> {
        match (self.status, &self.node) {
            (NodeStatus::Running, Some(node)) => Some(&node.config),
            _ => None,
        }
    }

    /// Instance of the process that is up, if any.
    pub fn running_instance(&self) -> Option<InstanceId> {
        match (self.status, &self.node) {
            (NodeStatus::Running, Some(node)) => Some(node.instance),
            _ => None,
        }
    }
}

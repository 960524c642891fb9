//! Node process lifecycle.
//!
//! [`NodeProcessController`] owns at most one running client process. It
//! stops the old process, acquires the binary, spawns the new one with flags
//! derived from its [`NodeConfig`], and polls a [`ReadinessProbe`] until the
//! node answers. Status changes are published on a watch channel.

mod args;
mod controller;
mod error;
mod process;
mod readiness;
mod types;

pub use args::{node_args, rpc_endpoint};
pub use controller::{
    ControllerConfig, NodeProcessController, RestartOutcome, RestartTicket, DEFAULT_READY_TIMEOUT,
    DEFAULT_RPC_PORT, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use error::{NodeError, NodeResult};
pub use readiness::{ReadinessProbe, RpcReadinessProbe, DEFAULT_PROBE_INTERVAL};
pub use types::{Network, NodeConfig, NodeSnapshot, NodeStatus, RunningNodeState, SyncMode};

#[cfg(test)]
pub(crate) use controller::mock;
#[cfg(all(test, unix))]
pub(crate) use process::fixtures;

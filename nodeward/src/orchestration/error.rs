//! Caller-visible errors of the orchestration facade.

use thiserror::Error;

use crate::acquire::AcquireError;
use crate::node::{Network, NodeError};
use crate::rpc::RpcError;
use crate::updater::UpdateError;

/// Why a mining toggle failed.
///
/// Cloneable so one outcome can be shared by coalesced toggles.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MiningError {
    /// Mining is only offered on test networks.
    #[error("Mining is not available on the {0} network")]
    Unavailable(Network),

    #[error("No node is running")]
    NodeNotRunning,

    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The orchestrator shut down before the toggle ran.
    #[error("Mining toggle interrupted by shutdown")]
    Interrupted,
}

/// Errors returned by [`NodeOrchestrator`](super::NodeOrchestrator).
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Mining(#[from] MiningError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error("Orchestrator has shut down")]
    Shutdown,
}

impl OrchestrationError {
    /// Whether a newer request replaced this one.
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Node(NodeError::Superseded))
    }
}

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

//! Node lifecycle error types.

use std::time::Duration;

use thiserror::Error;

use crate::acquire::AcquireError;

/// Errors returned by [`NodeProcessController`](super::NodeProcessController).
///
/// Except for [`Superseded`](Self::Superseded) and
/// [`InvalidConfig`](Self::InvalidConfig), a failed restart leaves the node
/// in `Failed`. The previous configuration is not restored.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The requested configuration is not valid for this client.
    #[error("Invalid node configuration: {0}")]
    InvalidConfig(String),

    /// The binary could not be made available.
    #[error("Node binary unavailable: {0}")]
    Acquire(#[from] AcquireError),

    #[error("Failed to spawn node '{binary}': {reason}")]
    SpawnFailed { binary: String, reason: String },

    /// The process started but never answered the readiness probe.
    #[error("Node not ready after {0:?}")]
    ReadyTimeout(Duration),

    /// The process exited before it became ready.
    #[error("Node exited during startup ({0})")]
    ExitedEarly(String),

    /// A newer restart replaced this one before it finished.
    #[error("Restart superseded by a newer request")]
    Superseded,

    #[error("Failed to stop node: {0}")]
    ShutdownFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// Whether the failure should move the node to `Failed`.
    pub(crate) fn marks_failed(&self) -> bool {
        !matches!(self, Self::Superseded | Self::InvalidConfig(_))
    }
}

pub type NodeResult<T> = Result<T, NodeError>;

//! RPC error types.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by [`NodeRpcClient`](super::NodeRpcClient).
///
/// Cloneable so that one failed call can be delivered to every coalesced
/// waiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    /// No node is attached, or the node the call targeted was torn down.
    #[error("Node RPC unavailable: {0}")]
    Unavailable(String),

    /// The node did not answer in time. Calls are never retried.
    #[error("RPC call {method} timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    /// The node answered with a JSON-RPC error object.
    #[error("Node rejected call ({code}): {message}")]
    Remote { code: i64, message: String },

    /// The request could not be sent or the reply was malformed.
    #[error("RPC transport error: {0}")]
    Transport(String),
}

pub type RpcResult<T> = Result<T, RpcError>;

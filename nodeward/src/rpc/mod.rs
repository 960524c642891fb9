//! JSON-RPC control channel to the running node.
//!
//! [`NodeRpcClient`] addresses whichever process the node controller has
//! attached. Overlapping identical calls are coalesced, each call has a
//! bounded timeout, and detaching a process fails its outstanding calls.

mod client;
mod coalesce;
mod error;
mod transport;
mod types;

pub use client::{NodeRpcClient, RpcConfig, DEFAULT_RPC_TIMEOUT};
pub use coalesce::{CallCoalescer, CoalescerStats};
pub use error::{RpcError, RpcResult};
pub use transport::{HttpTransport, RpcTransport};
pub use types::{InstanceId, RpcCall, RpcResponse, RpcTarget};

#[cfg(test)]
pub(crate) use client::mock;

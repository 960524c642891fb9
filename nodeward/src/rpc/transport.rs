//! Wire transport for node RPC calls.

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::trace;

use super::error::{RpcError, RpcResult};
use super::types::{RpcCall, RpcResponse};

/// Delivers one call to an endpoint and returns its result.
///
/// Timeouts are applied by the caller.
pub trait RpcTransport: Send + Sync {
    fn call<'a>(&'a self, endpoint: &'a str, call: &'a RpcCall) -> BoxFuture<'a, RpcResult<Value>>;
}

/// JSON-RPC 2.0 over HTTP POST.
#[derive(Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl RpcTransport for HttpTransport {
    fn call<'a>(&'a self, endpoint: &'a str, call: &'a RpcCall) -> BoxFuture<'a, RpcResult<Value>> {
        Box::pin(async move {
            trace!(endpoint, method = %call.method, id = call.correlation_id, "RPC request");

            let response = self
                .http
                .post(endpoint)
                .json(&call.to_request())
                .send()
                .await
                .map_err(|e| RpcError::Transport(e.to_string()))?;

            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| RpcError::Transport(e.to_string()))?;

            // Nodes report JSON-RPC errors with non-2xx codes too; prefer the body.
            match RpcResponse::parse(&body) {
                Ok(reply) => reply.into_result(call),
                Err(_) if !status.is_success() => {
                    Err(RpcError::Transport(format!("HTTP {}", status)))
                }
                Err(e) => Err(e),
            }
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish()
    }
}

//! JSON-RPC call and response shapes.

use std::fmt;

use serde::Deserialize;
use serde_json::{json, Value};

use super::error::RpcError;

/// Identity of one spawned node process.
///
/// A new instance id is issued for every spawn, so calls addressed to a
/// process that has since been replaced can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The process an [`RpcCall`] is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcTarget {
    pub instance: InstanceId,
    /// HTTP endpoint, e.g. `http://127.0.0.1:8545`.
    pub endpoint: String,
}

impl RpcTarget {
    pub fn new(instance: InstanceId, endpoint: impl Into<String>) -> Self {
        Self {
            instance,
            endpoint: endpoint.into(),
        }
    }
}

/// A single outgoing call.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
    pub correlation_id: u64,
}

impl RpcCall {
    pub fn new(method: impl Into<String>, params: Vec<Value>, correlation_id: u64) -> Self {
        Self {
            method: method.into(),
            params,
            correlation_id,
        }
    }

    /// JSON-RPC 2.0 request body.
    pub fn to_request(&self) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": self.correlation_id,
            "method": self.method,
            "params": self.params,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    code: i64,
    #[serde(default)]
    message: String,
}

/// A decoded JSON-RPC reply.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RemoteError>,
}

impl RpcResponse {
    pub fn parse(body: &[u8]) -> Result<Self, RpcError> {
        serde_json::from_slice(body)
            .map_err(|e| RpcError::Transport(format!("malformed response: {}", e)))
    }

    /// Match this reply against `call` and extract its result.
    pub fn into_result(self, call: &RpcCall) -> Result<Value, RpcError> {
        if self.id.as_u64() != Some(call.correlation_id) {
            return Err(RpcError::Transport(format!(
                "response id {} does not match request id {}",
                self.id, call.correlation_id
            )));
        }
        if let Some(error) = self.error {
            return Err(RpcError::Remote {
                code: error.code,
                message: error.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let call = RpcCall::new("miner_start", vec![json!(1)], 7);
        assert_eq!(
            call.to_request(),
            json!({"jsonrpc": "2.0", "id": 7, "method": "miner_start", "params": [1]})
        );
    }

    #[test]
    fn test_result_response() {
        let call = RpcCall::new("miner_stop", vec![], 3);
        let response = RpcResponse::parse(br#"{"jsonrpc":"2.0","id":3,"result":true}"#).unwrap();
        assert_eq!(response.into_result(&call).unwrap(), json!(true));
    }

    #[test]
    fn test_null_result() {
        let call = RpcCall::new("miner_stop", vec![], 3);
        let response = RpcResponse::parse(br#"{"jsonrpc":"2.0","id":3,"result":null}"#).unwrap();
        assert_eq!(response.into_result(&call).unwrap(), Value::Null);
    }

    #[test]
    fn test_error_response() {
        let call = RpcCall::new("miner_start", vec![json!(1)], 4);
        let response = RpcResponse::parse(
            br#"{"jsonrpc":"2.0","id":4,"error":{"code":-32601,"message":"method not found"}}"#,
        )
        .unwrap();
        assert_eq!(
            response.into_result(&call),
            Err(RpcError::Remote {
                code: -32601,
                message: "method not found".to_string()
            })
        );
    }

    #[test]
    fn test_mismatched_id() {
        let call = RpcCall::new("net_version", vec![], 5);
        let response = RpcResponse::parse(br#"{"jsonrpc":"2.0","id":6,"result":"1"}"#).unwrap();
        assert!(matches!(
            response.into_result(&call),
            Err(RpcError::Transport(_))
        ));
    }

    #[test]
    fn test_garbage_body() {
        assert!(matches!(
            RpcResponse::parse(b"<html>"),
            Err(RpcError::Transport(_))
        ));
    }
}

//! Control-call client for the running node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::coalesce::{CallCoalescer, CoalescerStats, Registration};
use super::error::{RpcError, RpcResult};
use super::transport::RpcTransport;
use super::types::{InstanceId, RpcCall, RpcTarget};

/// Default per-call timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`NodeRpcClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcConfig {
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RPC_TIMEOUT,
        }
    }
}

struct Attached {
    target: RpcTarget,
    cancel: CancellationToken,
}

/// Sends control calls to whichever node process is currently attached.
///
/// Identical calls (same method, same instance) that overlap in time are
/// sent once. Detaching an instance fails all of its pending calls with
/// [`RpcError::Unavailable`].
pub struct NodeRpcClient {
    transport: Arc<dyn RpcTransport>,
    coalescer: Arc<CallCoalescer>,
    attached: Mutex<Option<Attached>>,
    next_id: AtomicU64,
    config: RpcConfig,
}

impl NodeRpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>, config: RpcConfig) -> Self {
        Self {
            transport,
            coalescer: Arc::new(CallCoalescer::new()),
            attached: Mutex::new(None),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Address subsequent calls to `target`.
    ///
    /// A previously attached instance is detached first.
    pub fn attach(&self, target: RpcTarget) {
        let previous = self.lock().replace(Attached {
            target: target.clone(),
            cancel: CancellationToken::new(),
        });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
        debug!(instance = %target.instance, endpoint = %target.endpoint, "RPC target attached");
    }

    /// Stop addressing `instance`, failing its pending calls.
    ///
    /// Does nothing if a different instance is attached.
    pub fn detach(&self, instance: InstanceId) {
        let mut attached = self.lock();
        if attached.as_ref().map(|a| a.target.instance) == Some(instance) {
            if let Some(old) = attached.take() {
                old.cancel.cancel();
                debug!(%instance, "RPC target detached");
            }
        }
    }

    /// The currently attached target, if any.
    pub fn target(&self) -> Option<RpcTarget> {
        self.lock().as_ref().map(|a| a.target.clone())
    }

    pub fn stats(&self) -> CoalescerStats {
        self.coalescer.stats()
    }

    pub fn log_stats(&self) {
        self.coalescer.log_stats();
    }

    /// Send `method` with positional `params` to the attached node.
    ///
    /// Fails immediately with [`RpcError::Unavailable`] when nothing is
    /// attached. If the same method is already in flight against the same
    /// instance, waits for that call instead of sending another. Never
    /// retries.
    pub async fn send(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        let (target, cancel) = {
            let attached = self.lock();
            let attached = attached
                .as_ref()
                .ok_or_else(|| RpcError::Unavailable("no node is running".to_string()))?;
            (attached.target.clone(), attached.cancel.clone())
        };

        let key = (target.instance, method.to_string());
        let mut rx = match self.coalescer.register(&key) {
            Registration::Coalesced(rx) => rx,
            Registration::New(tx) => {
                let rx = tx.subscribe();
                let call = RpcCall::new(
                    method,
                    params,
                    self.next_id.fetch_add(1, Ordering::Relaxed),
                );
                // The call runs detached from this caller so that waiters
                // are still answered if the caller is dropped.
                tokio::spawn(dispatch(
                    self.transport.clone(),
                    self.coalescer.clone(),
                    key,
                    target,
                    call,
                    cancel,
                    self.config.timeout,
                ));
                rx
            }
        };

        rx.recv()
            .await
            .unwrap_or_else(|_| Err(RpcError::Unavailable("call abandoned".to_string())))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Attached>> {
        self.attached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn dispatch(
    transport: Arc<dyn RpcTransport>,
    coalescer: Arc<CallCoalescer>,
    key: (InstanceId, String),
    target: RpcTarget,
    call: RpcCall,
    cancel: CancellationToken,
    timeout: Duration,
) {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RpcError::Unavailable(format!(
            "node {} was stopped",
            target.instance
        ))),
        result = tokio::time::timeout(timeout, transport.call(&target.endpoint, &call)) => {
            result.unwrap_or_else(|_| Err(RpcError::Timeout {
                method: call.method.clone(),
                timeout,
            }))
        }
    };

    if let Err(e) = &outcome {
        warn!(
            instance = %target.instance,
            method = %call.method,
            error = %e,
            "RPC call failed"
        );
    }
    coalescer.complete(&key, outcome);
}

impl std::fmt::Debug for NodeRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRpcClient")
            .field("target", &self.target())
            .field("config", &self.config)
            .finish()
    }
}

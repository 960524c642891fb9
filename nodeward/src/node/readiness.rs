//! Readiness probing for freshly spawned nodes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::trace;

use crate::rpc::{RpcCall, RpcTransport};

/// Interval between readiness probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// Decides whether a node at `endpoint` has finished initialising.
pub trait ReadinessProbe: Send + Sync {
    fn is_ready<'a>(&'a self, endpoint: &'a str) -> BoxFuture<'a, bool>;
}

/// Considers the node ready once `web3_clientVersion` answers.
pub struct RpcReadinessProbe {
    transport: Arc<dyn RpcTransport>,
    attempt_timeout: Duration,
    next_id: AtomicU64,
}

impl RpcReadinessProbe {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            attempt_timeout: Duration::from_secs(1),
            next_id: AtomicU64::new(1),
        }
    }
}

impl ReadinessProbe for RpcReadinessProbe {
    fn is_ready<'a>(&'a self, endpoint: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let call = RpcCall::new(
                "web3_clientVersion",
                Vec::new(),
                self.next_id.fetch_add(1, Ordering::Relaxed),
            );
            match tokio::time::timeout(self.attempt_timeout, self.transport.call(endpoint, &call))
                .await
            {
                Ok(Ok(version)) => {
                    trace!(endpoint, %version, "Node answered readiness probe");
                    true
                }
                _ => false,
            }
        })
    }
}

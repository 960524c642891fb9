//! Single-flight de-duplication of node RPC calls.
//!
//! When several callers issue the same method against the same node instance
//! while a call is outstanding, only one request goes over the wire and every
//! caller receives the same result.
//!
//! ```text
//! toggle A ─┐
//!           ├──► CallCoalescer ──► one miner_start ──► node
//! toggle B ─┘         │                                  │
//!                     ▼                                  ▼
//!               [A, B receive the same result] ◄─────────┘
//! ```
//!
//! In-flight calls live in a `DashMap<CallKey, broadcast::Sender>`. The entry
//! API makes check-and-insert atomic: the first registration creates the
//! channel and later ones subscribe to it. Counters are atomics.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::error::RpcResult;
use super::types::InstanceId;

/// What makes two calls identical. Parameters are not part of the key.
pub(crate) type CallKey = (InstanceId, String);

pub(crate) type CallOutcome = RpcResult<Value>;

/// Tracks in-flight RPC calls.
pub struct CallCoalescer {
    in_flight: DashMap<CallKey, broadcast::Sender<CallOutcome>>,
    total_calls: AtomicU64,
    coalesced_calls: AtomicU64,
    new_calls: AtomicU64,
}

/// Counters for coalescing effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoalescerStats {
    pub total_calls: u64,
    /// Calls that attached to one already in flight.
    pub coalesced_calls: u64,
    /// Calls that went over the wire.
    pub new_calls: u64,
}

impl CoalescerStats {
    /// Fraction of calls that were coalesced (0.0 to 1.0).
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.coalesced_calls as f64 / self.total_calls as f64
        }
    }
}

/// Result of registering a call.
pub(crate) enum Registration {
    /// First caller: issue the call and [`complete`](CallCoalescer::complete) it.
    New(broadcast::Sender<CallOutcome>),
    /// An identical call is in flight: wait on this receiver.
    Coalesced(broadcast::Receiver<CallOutcome>),
}

impl CallCoalescer {
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
            total_calls: AtomicU64::new(0),
            coalesced_calls: AtomicU64::new(0),
            new_calls: AtomicU64::new(0),
        }
    }

    pub(crate) fn register(&self, key: &CallKey) -> Registration {
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let rx = entry.get().subscribe();
                self.coalesced_calls.fetch_add(1, Ordering::Relaxed);
                debug!(
                    instance = %key.0,
                    method = %key.1,
                    "Coalescing RPC call with one in flight"
                );
                Registration::Coalesced(rx)
            }
            Entry::Vacant(entry) => {
                // Typical fan-in is a handful of callers.
                let (tx, _rx) = broadcast::channel(16);
                entry.insert(tx.clone());
                self.new_calls.fetch_add(1, Ordering::Relaxed);
                Registration::New(tx)
            }
        }
    }

    /// Remove the call and hand `outcome` to every waiter.
    pub(crate) fn complete(&self, key: &CallKey, outcome: CallOutcome) {
        if let Some((_, tx)) = self.in_flight.remove(key) {
            let waiters = tx.receiver_count();
            // Receivers may all have gone away.
            let _ = tx.send(outcome);
            if waiters > 1 {
                debug!(instance = %key.0, method = %key.1, waiters, "Broadcast RPC result");
            }
        }
    }

    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            coalesced_calls: self.coalesced_calls.load(Ordering::Relaxed),
            new_calls: self.new_calls.load(Ordering::Relaxed),
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            total_calls = stats.total_calls,
            coalesced = stats.coalesced_calls,
            new_calls = stats.new_calls,
            in_flight = self.in_flight_count(),
            coalescing_ratio = format!("{:.1}%", stats.coalescing_ratio() * 100.0),
            "RPC coalescing statistics"
        );
    }
}

impl Default for CallCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

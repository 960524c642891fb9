//! The single managed node process.
//!
//! # State machine
//!
//! ```text
//!            restart              ready
//! Stopped ───────────► Starting ────────► Running
//!    ▲                    │                  │ stop / restart
//!    │                    │ error            ▼
//!    │                    └──────► Failed  Stopping ──► Stopped
//!    │                               │
//!    └───────────── stop ────────────┘   (restart: Failed ──► Starting)
//! ```
//!
//! # Supersession
//!
//! Every restart holds a [`RestartTicket`]. Issuing a new ticket invalidates
//! all older ones. An attempt whose ticket is stale gives up at its next
//! suspension point, tears down any child it already spawned, and returns
//! [`NodeError::Superseded`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::process::Child;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::args::{node_args, rpc_endpoint};
use super::error::{NodeError, NodeResult};
use super::process::{spawn_node, terminate};
use super::readiness::{ReadinessProbe, DEFAULT_PROBE_INTERVAL};
use super::types::{NodeConfig, NodeSnapshot, NodeStatus, RunningNodeState};
use crate::acquire::BinarySource;
use crate::rpc::{InstanceId, NodeRpcClient, RpcTarget};

/// Default JSON-RPC port of the node.
pub const DEFAULT_RPC_PORT: u16 = 8545;

/// Default time a node has to answer its first readiness probe.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time a node has to exit after being asked to.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`NodeProcessController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Chain data root. Each network gets a subdirectory.
    pub data_dir: PathBuf,
    pub rpc_port: u16,
    pub ready_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub probe_interval: Duration,
    /// Append-only file receiving the node's stdout and stderr.
    pub log_file: PathBuf,
}

impl ControllerConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            log_file: data_dir.join("node.log"),
            data_dir,
            rpc_port: DEFAULT_RPC_PORT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            probe_interval: DEFAULT_PROBE_INTERVAL,
        }
    }
}

/// Permission to run one restart. Only the newest ticket is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RestartTicket(u64);

/// Successful result of a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// A new process was started.
    Started(RunningNodeState),
    /// The requested config was already running; nothing was touched.
    Unchanged(RunningNodeState),
}

impl RestartOutcome {
    pub fn state(&self) -> &RunningNodeState {
        match self {
            Self::Started(state) | Self::Unchanged(state) => state,
        }
    }

    pub fn was_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

struct ManagedProcess {
    child: Child,
    state: RunningNodeState,
}

/// Owns the one node process of this application.
pub struct NodeProcessController {
    binaries: Arc<dyn BinarySource>,
    probe: Arc<dyn ReadinessProbe>,
    rpc: Arc<NodeRpcClient>,
    config: ControllerConfig,
    generation: watch::Sender<u64>,
    next_instance: AtomicU64,
    process: Mutex<Option<ManagedProcess>>,
    state: watch::Sender<NodeSnapshot>,
}

impl NodeProcessController {
    pub fn new(
        binaries: Arc<dyn BinarySource>,
        probe: Arc<dyn ReadinessProbe>,
        rpc: Arc<NodeRpcClient>,
        config: ControllerConfig,
    ) -> Self {
        let (generation, _) = watch::channel(0);
        let (state, _) = watch::channel(NodeSnapshot::default());
        Self {
            binaries,
            probe,
            rpc,
            config,
            generation,
            next_instance: AtomicU64::new(1),
            process: Mutex::new(None),
            state,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// RPC client addressed to the running process.
    pub fn rpc(&self) -> &Arc<NodeRpcClient> {
        &self.rpc
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<NodeSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> NodeStatus {
        self.state.borrow().status
    }

    /// Issue a new restart ticket, invalidating every earlier one.
    pub fn supersede(&self) -> RestartTicket {
        let mut issued = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            issued = *g;
        });
        RestartTicket(issued)
    }

    /// Run `config`, replacing whatever is running.
    pub async fn restart(&self, config: NodeConfig) -> NodeResult<RestartOutcome> {
        let ticket = self.supersede();
        self.restart_with(ticket, config).await
    }

    /// Run `config` under a ticket obtained earlier from [`supersede`](Self::supersede).
    ///
    /// Resolves immediately with [`RestartOutcome::Unchanged`] when `config`
    /// is already running. Otherwise the current process is stopped
    /// (gracefully, then forcibly), the binary is acquired, and the new
    /// process is spawned and probed until ready. Failure leaves the node in
    /// `Failed` with no process running.
    pub async fn restart_with(
        &self,
        ticket: RestartTicket,
        config: NodeConfig,
    ) -> NodeResult<RestartOutcome> {
        config.validate()?;

        let mut slot = tokio::select! {
            guard = self.process.lock() => guard,
            _ = self.superseded(ticket) => return Err(NodeError::Superseded),
        };
        self.check(ticket)?;

        if let Some(current) = slot.as_mut() {
            let alive = matches!(current.child.try_wait(), Ok(None));
            if alive && current.state.config == config && self.status() == NodeStatus::Running {
                debug!(config = %config, "Requested config already running");
                return Ok(RestartOutcome::Unchanged(current.state.clone()));
            }
        }

        match self.replace_process(ticket, &mut slot, config).await {
            Ok(state) => Ok(RestartOutcome::Started(state)),
            Err(NodeError::Superseded) => {
                debug!("Restart superseded");
                if slot.is_none() {
                    self.publish(|s| s.status = NodeStatus::Stopped);
                }
                Err(NodeError::Superseded)
            }
            Err(e) => {
                error!(error = %e, "Node restart failed");
                if e.marks_failed() {
                    let message = e.to_string();
                    self.publish(|s| {
                        s.status = NodeStatus::Failed;
                        s.last_error = Some(message);
                    });
                }
                Err(e)
            }
        }
    }

    /// Stop the node and abandon any restart in progress.
    pub async fn stop(&self) -> NodeResult<()> {
        self.supersede();
        let mut slot = self.process.lock().await;
        match slot.take() {
            Some(process) => self.teardown(process).await,
            None => {
                self.publish(|s| s.status = NodeStatus::Stopped);
                Ok(())
            }
        }
    }

    /// Stop the node for application exit.
    pub async fn shutdown(&self) -> NodeResult<()> {
        info!("Shutting down node controller");
        self.rpc.log_stats();
        self.stop().await
    }

    async fn replace_process(
        &self,
        ticket: RestartTicket,
        slot: &mut Option<ManagedProcess>,
        config: NodeConfig,
    ) -> NodeResult<RunningNodeState> {
        if let Some(previous) = slot.take() {
            self.teardown(previous).await?;
        }
        self.check(ticket)?;

        self.publish(|s| s.status = NodeStatus::Starting);
        info!(config = %config, "Starting node");

        let binary = tokio::select! {
            result = self.binaries.ensure_installed(&config.client_type) => result?,
            _ = self.superseded(ticket) => return Err(NodeError::Superseded),
        };
        self.check(ticket)?;

        let args = node_args(&config, &self.config.data_dir, self.config.rpc_port);
        let mut child = spawn_node(&binary, &args, &self.config.log_file)?;
        let instance = InstanceId(self.next_instance.fetch_add(1, Ordering::Relaxed));
        let endpoint = rpc_endpoint(self.config.rpc_port);
        info!(
            pid = child.id(),
            %instance,
            binary = %binary.display(),
            "Node process spawned"
        );

        if let Err(e) = self.await_ready(ticket, &mut child, &endpoint).await {
            if let Err(stop_err) = terminate(&mut child, self.config.shutdown_timeout).await {
                warn!(%instance, error = %stop_err, "Failed to stop abandoned node");
            }
            return Err(e);
        }

        let state = RunningNodeState {
            config,
            status: NodeStatus::Running,
            instance,
            pid: child.id(),
            binary,
            endpoint: endpoint.clone(),
            started_at: Utc::now(),
        };
        self.rpc.attach(RpcTarget::new(instance, endpoint));
        *slot = Some(ManagedProcess {
            child,
            state: state.clone(),
        });
        self.state.send_replace(NodeSnapshot {
            status: NodeStatus::Running,
            node: Some(state.clone()),
            last_error: None,
        });
        info!(%instance, pid = state.pid, config = %state.config, "Node running");
        Ok(state)
    }

    async fn await_ready(
        &self,
        ticket: RestartTicket,
        child: &mut Child,
        endpoint: &str,
    ) -> NodeResult<()> {
        let deadline = Instant::now() + self.config.ready_timeout;
        loop {
            self.check(ticket)?;
            if let Some(status) = child.try_wait()? {
                return Err(NodeError::ExitedEarly(status.to_string()));
            }
            let ready = tokio::select! {
                ready = self.probe.is_ready(endpoint) => ready,
                _ = self.superseded(ticket) => return Err(NodeError::Superseded),
            };
            if ready {
                return self.check(ticket);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(NodeError::ReadyTimeout(self.config.ready_timeout));
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.probe_interval.min(deadline - now)) => {}
                _ = self.superseded(ticket) => return Err(NodeError::Superseded),
            }
        }
    }

    async fn teardown(&self, mut process: ManagedProcess) -> NodeResult<()> {
        let instance = process.state.instance;
        self.publish(|s| {
            s.status = NodeStatus::Stopping;
            s.node = Some(process.state.with_status(NodeStatus::Stopping));
        });
        info!(%instance, pid = process.state.pid, "Stopping node");

        self.rpc.detach(instance);
        let result = terminate(&mut process.child, self.config.shutdown_timeout).await;

        match &result {
            Ok(()) => self.publish(|s| {
                s.status = NodeStatus::Stopped;
                s.node = Some(process.state.with_status(NodeStatus::Stopped));
            }),
            Err(e) => {
                let message = e.to_string();
                self.publish(|s| {
                    s.status = NodeStatus::Failed;
                    s.last_error = Some(message);
                });
            }
        }
        result
    }

    fn check(&self, ticket: RestartTicket) -> NodeResult<()> {
        if *self.generation.borrow() == ticket.0 {
            Ok(())
        } else {
            Err(NodeError::Superseded)
        }
    }

    /// Resolves once `ticket` is no longer the newest.
    async fn superseded(&self, ticket: RestartTicket) {
        let mut rx = self.generation.subscribe();
        let _ = rx.wait_for(|g| *g != ticket.0).await;
    }

    fn publish(&self, update: impl FnOnce(&mut NodeSnapshot)) {
        self.state.send_modify(|snapshot| {
            let from = snapshot.status;
            update(snapshot);
            if from != snapshot.status {
                debug!(from = %from, to = %snapshot.status, "Node status changed");
            }
        });
    }
}

impl std::fmt::Debug for NodeProcessController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeProcessController")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Test doubles for the controller's collaborators.

    use super::*;
    use crate::acquire::{AcquireError, AcquireResult};
    use futures::future::BoxFuture;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// Hands out a fixed binary path.
    pub(crate) struct FixedBinary {
        pub(crate) path: Option<PathBuf>,
        pub(crate) calls: AtomicUsize,
    }

    impl FixedBinary {
        pub(crate) fn at(path: &Path) -> Self {
            Self {
                path: Some(path.to_path_buf()),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn unavailable() -> Self {
            Self {
                path: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl BinarySource for FixedBinary {
        fn ensure_installed<'a>(
            &'a self,
            client_id: &'a str,
        ) -> BoxFuture<'a, AcquireResult<PathBuf>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.path
                    .clone()
                    .ok_or_else(|| AcquireError::UnsupportedPlatform {
                        client: client_id.to_string(),
                        target: "linux/x64".to_string(),
                    })
            })
        }
    }

    /// Readiness controlled by the test.
    pub(crate) struct SwitchProbe {
        pub(crate) ready: AtomicBool,
        pub(crate) probes: AtomicUsize,
    }

    impl SwitchProbe {
        pub(crate) fn new(ready: bool) -> Self {
            Self {
                ready: AtomicBool::new(ready),
                probes: AtomicUsize::new(0),
            }
        }

        pub(crate) fn set_ready(&self, ready: bool) {
            self.ready.store(ready, Ordering::SeqCst);
        }

        pub(crate) fn probes(&self) -> usize {
            self.probes.load(Ordering::SeqCst)
        }
    }

    /// Reports ready only once the test opens the gate.
    pub(crate) struct GatedProbe {
        pub(crate) gate: tokio::sync::Notify,
        pub(crate) entered: AtomicUsize,
    }

    impl GatedProbe {
        pub(crate) fn new() -> Self {
            Self {
                gate: tokio::sync::Notify::new(),
                entered: AtomicUsize::new(0),
            }
        }

        pub(crate) fn entered(&self) -> usize {
            self.entered.load(Ordering::SeqCst)
        }

        pub(crate) fn open(&self) {
            self.gate.notify_waiters();
        }
    }

    impl ReadinessProbe for GatedProbe {
        fn is_ready<'a>(&'a self, _endpoint: &'a str) -> BoxFuture<'a, bool> {
            Box::pin(async move {
                let opened = self.gate.notified();
                self.entered.fetch_add(1, Ordering::SeqCst);
                opened.await;
                true
            })
        }
    }

    impl ReadinessProbe for SwitchProbe {
        fn is_ready<'a>(&'a self, _endpoint: &'a str) -> BoxFuture<'a, bool> {
            Box::pin(async move {
                self.probes.fetch_add(1, Ordering::SeqCst);
                self.ready.load(Ordering::SeqCst)
            })
        }
    }
}

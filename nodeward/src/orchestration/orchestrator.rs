//! The facade front ends call.

use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{MiningError, OrchestrationError, OrchestrationResult};
use super::mining::MiningState;
use crate::acquire::BinarySource;
use crate::node::{
    Network, NodeConfig, NodeProcessController, NodeSnapshot, RestartOutcome, RestartTicket,
    SyncMode,
};
use crate::updater::{ReleaseUpdater, UpdateCheckResult};

type MiningOutcome = Result<MiningState, MiningError>;

/// Collaborators wired into a [`NodeOrchestrator`].
pub struct OrchestratorParts {
    pub controller: Arc<NodeProcessController>,
    pub updater: Arc<ReleaseUpdater>,
    pub binaries: Arc<dyn BinarySource>,
    /// Network and sync mode used when a switch leaves them unspecified.
    pub defaults: NodeConfig,
}

enum Command {
    Switch {
        ticket: RestartTicket,
        config: NodeConfig,
        reply: oneshot::Sender<OrchestrationResult<RestartOutcome>>,
    },
    ToggleMining {
        reply: oneshot::Sender<MiningOutcome>,
    },
    Stop {
        reply: oneshot::Sender<OrchestrationResult<()>>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Switch { .. } => "switch",
            Self::ToggleMining { .. } => "toggle-mining",
            Self::Stop { .. } => "stop",
        }
    }
}

/// Single entry point for switching nodes, toggling mining and checking for
/// client updates.
///
/// Mutating requests go through one queue and run strictly in order on a
/// worker task. A switch is registered with the controller as soon as it is
/// submitted, so a restart already running or waiting in the queue learns
/// immediately that it has been superseded. Reads bypass the queue.
pub struct NodeOrchestrator {
    commands: mpsc::UnboundedSender<Command>,
    controller: Arc<NodeProcessController>,
    updater: Arc<ReleaseUpdater>,
    binaries: Arc<dyn BinarySource>,
    /// Last requested config; fills in unspecified switch arguments.
    desired: StdMutex<NodeConfig>,
    mining: watch::Receiver<MiningState>,
    toggle_in_flight: Arc<Mutex<Option<broadcast::Sender<MiningOutcome>>>>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl NodeOrchestrator {
    /// Spawn the command worker and return the facade.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(parts: OrchestratorParts) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (mining_tx, mining) = watch::channel(MiningState::Off);
        let cancel = CancellationToken::new();

        let worker = Worker {
            controller: parts.controller.clone(),
            mining: mining_tx,
        };
        let handle = tokio::spawn(worker.run(rx, cancel.clone()));

        Self {
            commands,
            controller: parts.controller,
            updater: parts.updater,
            binaries: parts.binaries,
            desired: StdMutex::new(parts.defaults),
            mining,
            toggle_in_flight: Arc::new(Mutex::new(None)),
            cancel,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Switch to `client_type`, keeping the current network or sync mode
    /// where `None` is given.
    ///
    /// Resolves with [`RestartOutcome::Unchanged`] if that config is already
    /// running. If another switch is submitted before this one finishes, this
    /// call fails with [`NodeError::Superseded`](crate::node::NodeError::Superseded).
    pub async fn switch_node(
        &self,
        client_type: &str,
        network: Option<Network>,
        sync_mode: Option<SyncMode>,
    ) -> OrchestrationResult<RestartOutcome> {
        let (reply, rx) = oneshot::channel();
        {
            let mut desired = self.lock_desired();
            let config = NodeConfig::new(
                client_type,
                network.unwrap_or(desired.network),
                sync_mode.unwrap_or(desired.sync_mode),
            );
            config.validate()?;

            let ticket = self.controller.supersede();
            info!(config = %config, "Switch requested");
            self.commands
                .send(Command::Switch {
                    ticket,
                    config: config.clone(),
                    reply,
                })
                .map_err(|_| OrchestrationError::Shutdown)?;
            *desired = config;
        }
        rx.await.map_err(|_| OrchestrationError::Shutdown)?
    }

    /// Start mining if the node is not mining, stop it otherwise.
    ///
    /// Only available on test and dev networks. Toggles issued while one is
    /// outstanding share its outcome instead of toggling again.
    pub async fn toggle_mining(&self) -> OrchestrationResult<MiningState> {
        let mut rx = {
            let mut in_flight = self.toggle_in_flight.lock().await;
            match in_flight.as_ref() {
                Some(tx) => {
                    debug!("Joining in-flight mining toggle");
                    tx.subscribe()
                }
                None => {
                    let (reply, reply_rx) = oneshot::channel();
                    self.commands
                        .send(Command::ToggleMining { reply })
                        .map_err(|_| OrchestrationError::Shutdown)?;

                    let (tx, rx) = broadcast::channel(4);
                    *in_flight = Some(tx.clone());
                    let slot = self.toggle_in_flight.clone();
                    tokio::spawn(async move {
                        let outcome = reply_rx.await.unwrap_or(Err(MiningError::Interrupted));
                        slot.lock().await.take();
                        // Every waiter subscribed before the slot was cleared.
                        let _ = tx.send(outcome);
                    });
                    rx
                }
            }
        };

        let outcome = rx.recv().await.unwrap_or(Err(MiningError::Interrupted));
        Ok(outcome?)
    }

    /// Check the release feed for a newer `client_id` and update the catalog.
    ///
    /// Runs outside the command queue; it never touches the running process.
    pub async fn check_for_node_update(
        &self,
        client_id: &str,
    ) -> OrchestrationResult<UpdateCheckResult> {
        Ok(self.updater.check_for_update(client_id).await?)
    }

    /// Make sure a verified binary for `client_id` is installed.
    pub async fn ensure_binary(&self, client_id: &str) -> OrchestrationResult<PathBuf> {
        Ok(self.binaries.ensure_installed(client_id).await?)
    }

    /// Stop the node, abandoning any restart in progress.
    pub async fn stop(&self) -> OrchestrationResult<()> {
        let (reply, rx) = oneshot::channel();
        self.controller.supersede();
        self.commands
            .send(Command::Stop { reply })
            .map_err(|_| OrchestrationError::Shutdown)?;
        rx.await.map_err(|_| OrchestrationError::Shutdown)?
    }

    pub fn status(&self) -> NodeSnapshot {
        self.controller.snapshot()
    }

    /// Config of the node that is up, if any.
    pub fn current_config(&self) -> Option<NodeConfig> {
        self.controller.snapshot().running_config().cloned()
    }

    /// Config the next unspecified switch will be based on.
    pub fn desired_config(&self) -> NodeConfig {
        self.lock_desired().clone()
    }

    pub fn mining(&self) -> MiningState {
        *self.mining.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<NodeSnapshot> {
        self.controller.subscribe()
    }

    /// Stop the worker and the node. Queued requests fail with
    /// [`OrchestrationError::Shutdown`].
    pub async fn shutdown(&self) -> OrchestrationResult<()> {
        info!("Orchestrator shutting down");
        self.controller.supersede();
        self.cancel.cancel();
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Orchestrator worker ended abnormally");
            }
        }
        self.controller.shutdown().await?;
        Ok(())
    }

    fn lock_desired(&self) -> std::sync::MutexGuard<'_, NodeConfig> {
        self.desired
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for NodeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeOrchestrator")
            .field("desired", &self.desired_config())
            .field("mining", &self.mining())
            .finish()
    }
}

/// Drains the command queue one command at a time.
struct Worker {
    controller: Arc<NodeProcessController>,
    mining: watch::Sender<MiningState>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Command>, cancel: CancellationToken) {
        loop {
            let command = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                command = rx.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };
            debug!(command = command.name(), "Processing command");

            match command {
                Command::Switch {
                    ticket,
                    config,
                    reply,
                } => {
                    let before = self.controller.snapshot().running_instance();
                    let result = self.controller.restart_with(ticket, config).await;
                    // Mining belongs to the process, not to the request.
                    if self.controller.snapshot().running_instance() != before {
                        self.reset_mining();
                    }
                    let _ = reply.send(result.map_err(OrchestrationError::from));
                }
                Command::ToggleMining { reply } => {
                    let _ = reply.send(self.toggle_mining().await);
                }
                Command::Stop { reply } => {
                    let result = self.controller.stop().await;
                    self.reset_mining();
                    let _ = reply.send(result.map_err(OrchestrationError::from));
                }
            }
        }
        debug!("Orchestrator worker stopped");
    }

    async fn toggle_mining(&self) -> MiningOutcome {
        let network = self
            .controller
            .snapshot()
            .running_config()
            .map(|c| c.network)
            .ok_or(MiningError::NodeNotRunning)?;
        if !network.supports_mining() {
            return Err(MiningError::Unavailable(network));
        }

        let current = *self.mining.borrow();
        let (method, params) = current.toggle_call();
        let result = self.controller.rpc().send(method, params).await?;

        let next = current.after_toggle(&result);
        if next == current {
            warn!(method, %result, "Node declined mining toggle");
        } else {
            info!(mining = %next, "Mining toggled");
        }
        self.mining.send_replace(next);
        Ok(next)
    }

    fn reset_mining(&self) {
        self.mining.send_replace(MiningState::Off);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sample_manifest;
    use crate::catalog::BinaryCatalog;
    use crate::node::fixtures::fake_node;
    use crate::node::mock::{FixedBinary, SwitchProbe};
    use crate::node::{ControllerConfig, NodeError};
    use crate::rpc::mock::MockTransport;
    use crate::rpc::{NodeRpcClient, RpcConfig, RpcError};
    use crate::updater::{
        ChecksumListing, ChecksumListingSource, ReleaseFeed, UpdateError, UpdateResult,
    };
    use futures::future::BoxFuture;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    struct FixedFeed(&'static str);

    impl ReleaseFeed for FixedFeed {
        fn latest_tag(&self) -> BoxFuture<'_, UpdateResult<String>> {
            Box::pin(async move { Ok(self.0.to_string()) })
        }

        fn commit_for_tag<'a>(&'a self, _tag: &'a str) -> BoxFuture<'a, UpdateResult<String>> {
            Box::pin(async move { Err(UpdateError::network("mock://commit", "unreachable")) })
        }
    }

    struct EmptyListing;

    impl ChecksumListingSource for EmptyListing {
        fn fetch_listing(&self) -> BoxFuture<'_, UpdateResult<ChecksumListing>> {
            Box::pin(async move { Ok(ChecksumListing::default()) })
        }
    }

    struct Harness {
        _temp: TempDir,
        transport: Arc<MockTransport>,
        probe: Arc<SwitchProbe>,
        binaries: Arc<FixedBinary>,
        orchestrator: NodeOrchestrator,
    }

    fn harness_with(transport: MockTransport) -> Harness {
        let temp = TempDir::new().unwrap();
        let bin = fake_node(temp.path(), "bith", "exec sleep 30");
        let binaries = Arc::new(FixedBinary::at(&bin));
        let probe = Arc::new(SwitchProbe::new(true));
        let transport = Arc::new(transport);
        let rpc = Arc::new(NodeRpcClient::new(transport.clone(), RpcConfig::default()));

        let mut config = ControllerConfig::new(temp.path().join("data"));
        config.probe_interval = Duration::from_millis(20);
        config.shutdown_timeout = Duration::from_secs(2);
        let controller = Arc::new(NodeProcessController::new(
            binaries.clone(),
            probe.clone(),
            rpc,
            config,
        ));

        let catalog = Arc::new(BinaryCatalog::with_manifest(
            temp.path().join("clientBinaries.json"),
            sample_manifest(),
        ));
        let updater = Arc::new(ReleaseUpdater::new(
            catalog,
            Arc::new(FixedFeed("v1.4.2")),
            Arc::new(EmptyListing),
        ));

        let orchestrator = NodeOrchestrator::start(OrchestratorParts {
            controller,
            updater,
            binaries: binaries.clone(),
            defaults: NodeConfig::new("bith", Network::Main, SyncMode::Fast),
        });

        Harness {
            _temp: temp,
            transport,
            probe,
            binaries,
            orchestrator,
        }
    }

    fn harness() -> Harness {
        harness_with(MockTransport::replying(Ok(json!(true))))
    }

    #[tokio::test]
    async fn test_switch_keeps_unspecified_settings() {
        let h = harness();

        h.orchestrator
            .switch_node("bith", Some(Network::Test), Some(SyncMode::Full))
            .await
            .unwrap();
        h.orchestrator
            .switch_node("bith", Some(Network::Dev), None)
            .await
            .unwrap();

        assert_eq!(
            h.orchestrator.current_config(),
            Some(NodeConfig::new("bith", Network::Dev, SyncMode::Full))
        );
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_switch_to_running_config_is_noop() {
        let h = harness();

        h.orchestrator
            .switch_node("bith", Some(Network::Test), None)
            .await
            .unwrap();
        let again = h
            .orchestrator
            .switch_node("Bith", Some(Network::Test), None)
            .await
            .unwrap();

        assert!(!again.was_started());
        assert_eq!(h.binaries.calls(), 1);
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_switch_rejected_before_queueing() {
        let h = harness();

        let result = h
            .orchestrator
            .switch_node("bith", Some(Network::Dev), Some(SyncMode::Light))
            .await;

        assert!(matches!(
            result,
            Err(OrchestrationError::Node(NodeError::InvalidConfig(_)))
        ));
        assert_eq!(h.orchestrator.desired_config().network, Network::Main);
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_later_switch_supersedes_earlier() {
        let h = harness();
        h.probe.set_ready(false);

        let (first, second) = tokio::join!(
            h.orchestrator
                .switch_node("bith", Some(Network::Test), None),
            async {
                while h.probe.probes() == 0 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                h.probe.set_ready(true);
                h.orchestrator
                    .switch_node("bith", Some(Network::Dev), None)
                    .await
            }
        );

        assert!(first.unwrap_err().is_superseded());
        assert_eq!(second.unwrap().state().config.network, Network::Dev);
        assert_eq!(
            h.orchestrator.current_config().map(|c| c.network),
            Some(Network::Dev)
        );
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_toggle_mining_flips_state() {
        let h = harness();
        h.orchestrator
            .switch_node("bith", Some(Network::Test), None)
            .await
            .unwrap();

        assert_eq!(h.orchestrator.toggle_mining().await.unwrap(), MiningState::On);
        assert_eq!(h.orchestrator.toggle_mining().await.unwrap(), MiningState::Off);
        assert_eq!(h.transport.methods(), vec!["miner_start", "miner_stop"]);
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_toggles_send_one_call() {
        let gate = Arc::new(Notify::new());
        let h = harness_with(MockTransport::gated(Ok(json!(true)), gate.clone()));
        h.orchestrator
            .switch_node("bith", Some(Network::Dev), None)
            .await
            .unwrap();

        let (a, b) = tokio::join!(h.orchestrator.toggle_mining(), async {
            while h.transport.call_count() == 0 {
                tokio::task::yield_now().await;
            }
            let pending = h.orchestrator.toggle_mining();
            gate.notify_one();
            pending.await
        });

        assert_eq!(a.unwrap(), MiningState::On);
        assert_eq!(b.unwrap(), MiningState::On);
        assert_eq!(h.transport.call_count(), 1);
        assert_eq!(h.orchestrator.mining(), MiningState::On);
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_declined_toggle_keeps_state() {
        let h = harness_with(MockTransport::replying(Ok(Value::Bool(false))));
        h.orchestrator
            .switch_node("bith", Some(Network::Test), None)
            .await
            .unwrap();

        assert_eq!(h.orchestrator.toggle_mining().await.unwrap(), MiningState::Off);
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mining_unavailable_on_main() {
        let h = harness();
        h.orchestrator.switch_node("bith", None, None).await.unwrap();

        assert!(matches!(
            h.orchestrator.toggle_mining().await,
            Err(OrchestrationError::Mining(MiningError::Unavailable(Network::Main)))
        ));
        assert_eq!(h.transport.call_count(), 0);
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mining_requires_running_node() {
        let h = harness();
        assert!(matches!(
            h.orchestrator.toggle_mining().await,
            Err(OrchestrationError::Mining(MiningError::NodeNotRunning))
        ));
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_rpc_failure_surfaces() {
        let h = harness_with(MockTransport::replying(Err(RpcError::Transport(
            "connection reset".to_string(),
        ))));
        h.orchestrator
            .switch_node("bith", Some(Network::Test), None)
            .await
            .unwrap();

        assert!(matches!(
            h.orchestrator.toggle_mining().await,
            Err(OrchestrationError::Mining(MiningError::Rpc(RpcError::Transport(_))))
        ));
        assert_eq!(h.orchestrator.mining(), MiningState::Off);
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_resets_mining() {
        let h = harness();
        h.orchestrator
            .switch_node("bith", Some(Network::Test), None)
            .await
            .unwrap();
        h.orchestrator.toggle_mining().await.unwrap();

        h.orchestrator
            .switch_node("bith", Some(Network::Dev), None)
            .await
            .unwrap();

        assert_eq!(h.orchestrator.mining(), MiningState::Off);
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_superseded_switch_back_keeps_mining() {
        let h = harness();
        h.orchestrator
            .switch_node("bith", Some(Network::Test), None)
            .await
            .unwrap();
        h.orchestrator.toggle_mining().await.unwrap();

        let (away, back) = tokio::join!(
            h.orchestrator.switch_node("bith", Some(Network::Dev), None),
            h.orchestrator.switch_node("bith", Some(Network::Test), None)
        );

        assert!(away.unwrap_err().is_superseded());
        assert!(!back.unwrap().was_started());
        assert_eq!(h.binaries.calls(), 1);
        assert_eq!(h.orchestrator.mining(), MiningState::On);

        assert_eq!(h.orchestrator.toggle_mining().await.unwrap(), MiningState::Off);
        assert_eq!(h.transport.methods(), vec!["miner_start", "miner_stop"]);
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_check_runs_beside_queue() {
        let h = harness();
        let result = h.orchestrator.check_for_node_update("bith").await.unwrap();
        assert!(!result.has_update);
        assert_eq!(result.current_version, semver::Version::new(1, 4, 2));
        h.orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_then_shutdown() {
        let h = harness();
        h.orchestrator
            .switch_node("bith", Some(Network::Test), None)
            .await
            .unwrap();

        h.orchestrator.stop().await.unwrap();
        assert_eq!(h.orchestrator.status().status, crate::node::NodeStatus::Stopped);

        h.orchestrator.shutdown().await.unwrap();
        assert!(matches!(
            h.orchestrator.switch_node("bith", None, None).await,
            Err(OrchestrationError::Shutdown)
        ));
    }
}

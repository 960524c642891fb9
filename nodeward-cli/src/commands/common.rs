//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use nodeward::acquire::{BinaryAcquirer, HttpDownloader};
use nodeward::catalog::BinaryCatalog;
use nodeward::config::ConfigFile;
use nodeward::logging::{init_logging, LoggingGuard};
use nodeward::node::{NodeProcessController, RpcReadinessProbe};
use nodeward::orchestration::{NodeOrchestrator, OrchestratorParts};
use nodeward::rpc::{HttpTransport, NodeRpcClient, RpcTransport};
use nodeward::updater::{GithubReleaseFeed, HttpListingSource, ReleaseUpdater};

use crate::error::CliError;

/// Load the configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Start file and console logging as configured.
pub fn start_logging(config: &ConfigFile) -> Result<LoggingGuard, CliError> {
    init_logging(&config.logging.file).map_err(|e| CliError::LoggingInit(e.to_string()))
}

/// Library components wired from one configuration.
pub struct Components {
    pub catalog: Arc<BinaryCatalog>,
    pub acquirer: Arc<BinaryAcquirer>,
    pub updater: Arc<ReleaseUpdater>,
    rpc: Arc<NodeRpcClient>,
    transport: Arc<dyn RpcTransport>,
    config: ConfigFile,
}

impl Components {
    /// Load the catalog and build the acquirer, updater, and RPC client.
    pub fn build(config: &ConfigFile) -> Result<Self, CliError> {
        let manifest: PathBuf = config.binaries.manifest.clone();
        let catalog = BinaryCatalog::load(&manifest).map_err(|error| CliError::Catalog {
            path: manifest.clone(),
            error,
        })?;
        let catalog = Arc::new(catalog);

        let acquirer = Arc::new(BinaryAcquirer::new(
            catalog.clone(),
            Arc::new(HttpDownloader::new()),
            config.acquirer_config(),
        ));

        let feed_config = config.feed_config();
        let updater = Arc::new(ReleaseUpdater::new(
            catalog.clone(),
            Arc::new(GithubReleaseFeed::new(&feed_config)),
            Arc::new(HttpListingSource::new(&feed_config)),
        ));

        let transport: Arc<dyn RpcTransport> = Arc::new(HttpTransport::new());
        let rpc = Arc::new(NodeRpcClient::new(transport.clone(), config.rpc_config()));

        Ok(Self {
            catalog,
            acquirer,
            updater,
            rpc,
            transport,
            config: config.clone(),
        })
    }

    /// Add the process controller and start the orchestrator.
    ///
    /// Must be called within a Tokio runtime.
    pub fn into_orchestrator(self) -> NodeOrchestrator {
        let controller = Arc::new(NodeProcessController::new(
            self.acquirer.clone(),
            Arc::new(RpcReadinessProbe::new(self.transport)),
            self.rpc,
            self.config.controller_config(),
        ));

        NodeOrchestrator::start(OrchestratorParts {
            controller,
            updater: self.updater,
            binaries: self.acquirer,
            defaults: self.config.node_config(),
        })
    }
}

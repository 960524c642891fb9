//! Nodeward - client binary and process lifecycle manager for embedded nodes
//!
//! This library keeps a catalog of supported blockchain client binaries in
//! sync with upstream releases, installs checksum-verified binaries for the
//! host platform, and runs exactly one node process at a time while relaying
//! control calls to it over JSON-RPC.
//!
//! # High-Level API
//!
//! Front ends talk to the [`orchestration`] module only:
//!
//! ```ignore
//! use nodeward::orchestration::{NodeOrchestrator, OrchestratorParts};
//! use nodeward::node::{Network, SyncMode};
//!
//! let orchestrator = NodeOrchestrator::start(parts);
//! orchestrator.switch_node("bith", Some(Network::Test), Some(SyncMode::Fast)).await?;
//! let mining = orchestrator.toggle_mining().await?;
//! let update = orchestrator.check_for_node_update("bith").await?;
//! ```

pub mod acquire;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod node;
pub mod orchestration;
pub mod platform;
pub mod rpc;
pub mod updater;
pub mod version;

/// Version of the nodeward library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

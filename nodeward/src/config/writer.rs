//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let log_file = config
        .node
        .log_file
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();

    format!(
        r#"[node]
; Client to run, by its id in the binary catalog
client = {}
; Network: main, test (Ropsten), rinkeby, or dev (single-node solo chain)
network = {}
; Sync mode: fast, light, or full. Light sync is not available on dev.
sync_mode = {}
; Chain data root. Each network is stored in its own subdirectory.
data_dir = {}
; Local JSON-RPC port of the node (default: 8545)
rpc_port = {}
; Seconds a freshly started node has to answer RPC (default: 30)
ready_timeout = {}
; Seconds a node has to exit before it is killed (default: 10)
shutdown_timeout = {}
; Node stdout/stderr. If empty, defaults to <data_dir>/node.log
log_file = {}

[binaries]
; Catalog of supported client binaries
manifest = {}
; Where verified binaries are installed
install_dir = {}
; Seconds the post-install sanity command may take (default: 10)
sanity_timeout = {}

[updates]
; Latest-release endpoint returning {{"tag_name": ...}}
release_url = {}
; Commit endpoint returning {{"sha": ...}}; {{tag}} is replaced by the release tag
commit_url = {}
; Object-storage container listing (XML) of release assets with their Content-MD5
listing_url = {}
; HTTP timeout in seconds (default: 30)
timeout = {}

[rpc]
; Per-call timeout in seconds (default: 10). Calls are never retried.
timeout = {}

[logging]
; Manager log file
file = {}
"#,
        config.node.client,
        config.node.network,
        config.node.sync_mode,
        path_to_string(&config.node.data_dir),
        config.node.rpc_port,
        config.node.ready_timeout,
        config.node.shutdown_timeout,
        log_file,
        path_to_string(&config.binaries.manifest),
        path_to_string(&config.binaries.install_dir),
        config.binaries.sanity_timeout,
        config.updates.release_url,
        config.updates.commit_url,
        config.updates.listing_url,
        config.updates.timeout,
        config.rpc.timeout,
        path_to_string(&config.logging.file),
    )
}

/// Convert path to string, collapsing home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

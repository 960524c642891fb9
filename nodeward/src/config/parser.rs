//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! The single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse `key` of `section` with `FromStr`, if present.
fn parse_value<T: FromStr>(
    props: &Properties,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<Option<T>, ConfigFileError> {
    match props.get(key).map(str::trim) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| invalid(section, key, v, reason)),
    }
}

/// A non-empty trimmed string value, if present.
fn non_empty<'a>(props: &'a Properties, key: &str) -> Option<&'a str> {
    props.get(key).map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [node] section
    if let Some(section) = ini.section(Some("node")) {
        if let Some(v) = non_empty(section, "client") {
            config.node.client = v.to_lowercase();
        }
        if let Some(v) = section.get("network") {
            config.node.network = v
                .trim()
                .parse()
                .map_err(|_| invalid("node", "network", v, "must be one of: main, test, rinkeby, dev"))?;
        }
        if let Some(v) = section.get("sync_mode") {
            config.node.sync_mode = v
                .trim()
                .parse()
                .map_err(|_| invalid("node", "sync_mode", v, "must be one of: fast, light, full"))?;
        }
        if let Some(v) = non_empty(section, "data_dir") {
            config.node.data_dir = expand_tilde(v);
        }
        if let Some(v) = parse_value(section, "node", "rpc_port", "must be a port number (1-65535)")? {
            if v == 0 {
                return Err(invalid("node", "rpc_port", "0", "must be a port number (1-65535)"));
            }
            config.node.rpc_port = v;
        }
        if let Some(v) = parse_value(
            section,
            "node",
            "ready_timeout",
            "must be a positive integer (seconds)",
        )? {
            config.node.ready_timeout = v;
        }
        if let Some(v) = parse_value(
            section,
            "node",
            "shutdown_timeout",
            "must be a positive integer (seconds)",
        )? {
            config.node.shutdown_timeout = v;
        }
        if let Some(v) = non_empty(section, "log_file") {
            config.node.log_file = Some(expand_tilde(v));
        }
    }

    // [binaries] section
    if let Some(section) = ini.section(Some("binaries")) {
        if let Some(v) = non_empty(section, "manifest") {
            config.binaries.manifest = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "install_dir") {
            config.binaries.install_dir = expand_tilde(v);
        }
        if let Some(v) = parse_value(
            section,
            "binaries",
            "sanity_timeout",
            "must be a positive integer (seconds)",
        )? {
            config.binaries.sanity_timeout = v;
        }
    }

    // [updates] section
    if let Some(section) = ini.section(Some("updates")) {
        if let Some(v) = non_empty(section, "release_url") {
            config.updates.release_url = v.to_string();
        }
        if let Some(v) = non_empty(section, "commit_url") {
            if !v.contains("{tag}") {
                return Err(invalid(
                    "updates",
                    "commit_url",
                    v,
                    "must contain the {tag} placeholder",
                ));
            }
            config.updates.commit_url = v.to_string();
        }
        if let Some(v) = section.get("listing_url") {
            config.updates.listing_url = v.trim().to_string();
        }
        if let Some(v) = parse_value(
            section,
            "updates",
            "timeout",
            "must be a positive integer (seconds)",
        )? {
            config.updates.timeout = v;
        }
    }

    // [rpc] section
    if let Some(section) = ini.section(Some("rpc")) {
        if let Some(v) = parse_value(section, "rpc", "timeout", "must be a positive integer (seconds)")? {
            config.rpc.timeout = v;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

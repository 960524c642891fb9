//! Loading and saving `config.ini`.
//!
//! The file lives in the nodeward home directory, `~/.nodeward` unless
//! `NODEWARD_HOME` points elsewhere. Loading rejects settings that would
//! only fail later, when the node is started. Saving goes through a sibling
//! temporary file so a crash never leaves a truncated config behind.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::settings::ConfigFile;
use crate::node::NodeError;

/// Environment variable that relocates the nodeward home directory.
pub const HOME_ENV: &str = "NODEWARD_HOME";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// A missing file yields the defaults. The `[node]` section must
    /// describe a node that can actually be started.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = super::parser::parse_ini(&ini)?;
        config.check_node()?;
        Ok(config)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path, replacing it atomically.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let write_err = |source: std::io::Error| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(write_err)?;

        let content = super::writer::to_config_string(self);
        let mut temp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
        temp.write_all(content.as_bytes()).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(path).map_err(|e| write_err(e.error))?;

        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    fn check_node(&self) -> Result<(), ConfigFileError> {
        let Err(e) = self.node_config().validate() else {
            return Ok(());
        };
        let (key, value) = if self.node.client.trim().is_empty() {
            ("client", self.node.client.clone())
        } else {
            ("sync_mode", self.node.sync_mode.to_string())
        };
        let reason = match e {
            NodeError::InvalidConfig(reason) => reason,
            other => other.to_string(),
        };
        Err(ConfigFileError::InvalidValue {
            section: "node".to_string(),
            key: key.to_string(),
            value,
            reason,
        })
    }
}

/// The nodeward home directory: `$NODEWARD_HOME`, else `~/.nodeward`.
pub fn config_directory() -> PathBuf {
    resolve_directory(std::env::var_os(HOME_ENV), dirs::home_dir())
}

fn resolve_directory(override_dir: Option<OsString>, home: Option<PathBuf>) -> PathBuf {
    match override_dir {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home.unwrap_or_else(|| PathBuf::from(".")).join(".nodeward"),
    }
}

/// Path to `config.ini` inside [`config_directory`].
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

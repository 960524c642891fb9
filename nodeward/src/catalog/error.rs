//! Catalog error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, querying, or replacing the binary catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The manifest file could not be read.
    #[error("Failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The manifest file is not a valid catalog document.
    #[error("Failed to parse catalog: {0}")]
    Parse(String),

    /// The manifest could not be persisted.
    #[error("Failed to write catalog {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    /// No client with the given identifier exists in the catalog.
    #[error("Unknown client '{0}'")]
    UnknownClient(String),

    /// A client's version field is not a three-component version.
    #[error("Invalid version '{version}' for client '{client}'")]
    InvalidVersion { client: String, version: String },

    /// A replacement manifest would lower a client's version.
    #[error("Refusing to lower {client} from {current} to {proposed}")]
    VersionRegression {
        client: String,
        current: String,
        proposed: String,
    },
}

/// Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

//! Binary acquisition error types.

use thiserror::Error;

use crate::catalog::CatalogError;

/// Errors raised while installing a client binary.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The catalog publishes no binary for this host.
    #[error("No {client} binary published for {target}")]
    UnsupportedPlatform { client: String, target: String },

    /// The artifact could not be fetched. Retry later.
    #[error("Download of {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The artifact's digest differs from the catalog. The artifact has been
    /// deleted.
    #[error("Checksum mismatch for {url}: expected '{expected}', got '{actual}'")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    /// The verified artifact did not contain the expected executable.
    #[error("Failed to extract '{bin}' from archive: {reason}")]
    Extract { bin: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Result alias for acquisition operations.
pub type AcquireResult<T> = Result<T, AcquireError>;

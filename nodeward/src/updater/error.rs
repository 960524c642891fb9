//! Update-check error types.

use thiserror::Error;

use crate::catalog::CatalogError;

/// Errors that abort an update check.
///
/// A failed check never modifies the catalog.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Transport failure or non-success HTTP status. Retry later.
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    /// The remote response did not have the expected shape.
    #[error("Malformed response from {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    /// Reading or replacing the catalog failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl UpdateError {
    pub(crate) fn network(url: &str, reason: impl ToString) -> Self {
        Self::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn parse(source_name: &str, reason: impl ToString) -> Self {
        Self::Parse {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias for update operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

//! In-memory catalog with atomic on-disk persistence.
//!
//! Reads go through an [`ArcSwap`] and never take a lock. Writes are
//! serialized by a mutex, persisted through a sibling temporary file that is
//! renamed over the target, and only then published to readers.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::{CatalogError, CatalogResult};
use super::types::{ClientEntry, ClientManifest};

/// The single source of truth for client binaries.
pub struct BinaryCatalog {
    path: PathBuf,
    current: ArcSwap<ClientManifest>,
    write_lock: Mutex<()>,
}

impl BinaryCatalog {
    /// Load the catalog from a manifest file.
    pub fn load(path: impl Into<PathBuf>) -> CatalogResult<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|source| CatalogError::Read {
            path: path.clone(),
            source,
        })?;
        let manifest = ClientManifest::from_json(&content)?;

        info!(
            path = %path.display(),
            clients = manifest.clients.len(),
            "Loaded client binary catalog"
        );

        Ok(Self::with_manifest(path, manifest))
    }

    /// Create a catalog backed by `path` without touching the filesystem.
    ///
    /// The manifest is written on the first [`replace`](Self::replace).
    pub fn with_manifest(path: impl Into<PathBuf>, manifest: ClientManifest) -> Self {
        Self {
            path: path.into(),
            current: ArcSwap::from_pointee(manifest),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the persisted manifest.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current manifest. Cheap; holds no lock.
    pub fn snapshot(&self) -> Arc<ClientManifest> {
        self.current.load_full()
    }

    /// Look up a single client entry.
    pub fn get(&self, client_id: &str) -> CatalogResult<ClientEntry> {
        self.current
            .load()
            .client(client_id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownClient(client_id.to_string()))
    }

    /// Replace the whole manifest, on disk and in memory.
    ///
    /// No client's version may go backwards. Readers observe either the old
    /// or the new manifest, never a mix; the file on disk is swapped by a
    /// single rename.
    pub async fn replace(&self, manifest: ClientManifest) -> CatalogResult<()> {
        let _guard = self.write_lock.lock().await;

        check_monotonic(&self.current.load(), &manifest)?;

        let content = manifest.to_pretty_json()?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, content.as_bytes()))
            .await
            .map_err(|e| CatalogError::Write {
                path: self.path.clone(),
                reason: e.to_string(),
            })??;

        self.current.store(Arc::new(manifest));
        info!(path = %self.path.display(), "Catalog replaced");
        Ok(())
    }
}

impl std::fmt::Debug for BinaryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryCatalog")
            .field("path", &self.path)
            .field("clients", &self.current.load().clients.len())
            .finish()
    }
}

/// Reject a replacement that lowers any existing client's version.
fn check_monotonic(current: &ClientManifest, proposed: &ClientManifest) -> CatalogResult<()> {
    for (id, entry) in &proposed.clients {
        let Some(existing) = current.clients.get(id) else {
            continue;
        };
        let old = existing.semver(id)?;
        let new = entry.semver(id)?;
        if new < old {
            return Err(CatalogError::VersionRegression {
                client: id.clone(),
                current: existing.version.clone(),
                proposed: entry.version.clone(),
            });
        }
    }
    Ok(())
}

/// Write `content` to `path` via a temp file in the same directory.
fn write_atomic(path: &Path, content: &[u8]) -> CatalogResult<()> {
    let write_err = |reason: String| CatalogError::Write {
        path: path.to_path_buf(),
        reason,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| write_err(e.to_string()))?;

    let mut temp =
        tempfile::NamedTempFile::new_in(&parent).map_err(|e| write_err(e.to_string()))?;
    temp.write_all(content)
        .map_err(|e| write_err(e.to_string()))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| write_err(e.to_string()))?;
    temp.persist(path)
        .map_err(|e| write_err(e.error.to_string()))?;

    debug!(path = %path.display(), bytes = content.len(), "Catalog persisted");
    Ok(())
}

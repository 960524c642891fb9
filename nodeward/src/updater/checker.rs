//! Release checking and catalog rewriting.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use semver::Version;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::error::{UpdateError, UpdateResult};
use super::feed::ReleaseFeed;
use super::listing::{ChecksumListing, ChecksumListingSource};
use super::tokens::{
    asset_name, has_version_token, rewrite_version_token, short_hash, update_sanity_output,
};
use crate::catalog::{BinaryCatalog, CatalogError, ClientEntry};
use crate::version::extract_version;

/// Outcome of an update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheckResult {
    /// Catalog key of the checked client.
    pub client_id: String,
    pub latest_version: Version,
    pub current_version: Version,
    pub has_update: bool,
    /// Short commit id of the adopted release, when there was one.
    pub commit_hash: Option<String>,
    /// Checksums applied to the catalog, keyed by asset name.
    pub checksums_by_asset: BTreeMap<String, String>,
    /// Non-fatal problems with individual platform entries.
    pub warnings: Vec<UpdateWarning>,
}

/// A per-entry problem that did not abort the update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateWarning {
    /// The listing had no checksum for this entry's asset; the old checksum
    /// was kept.
    ChecksumNotFound {
        platform: String,
        arch: String,
        asset: String,
    },
    /// A URL or binary path carried no version token to rewrite.
    TokenNotFound {
        platform: String,
        arch: String,
        field: &'static str,
    },
}

impl fmt::Display for UpdateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumNotFound {
                platform,
                arch,
                asset,
            } => write!(
                f,
                "no checksum listed for {} ({}/{}); keeping previous checksum",
                asset, platform, arch
            ),
            Self::TokenNotFound {
                platform,
                arch,
                field,
            } => write!(
                f,
                "{} for {}/{} has no version token; left unchanged",
                field, platform, arch
            ),
        }
    }
}

/// Checks a release feed and advances the catalog when a newer release exists.
pub struct ReleaseUpdater {
    catalog: Arc<BinaryCatalog>,
    feed: Arc<dyn ReleaseFeed>,
    listing: Arc<dyn ChecksumListingSource>,
    cycle: Mutex<()>,
}

impl ReleaseUpdater {
    pub fn new(
        catalog: Arc<BinaryCatalog>,
        feed: Arc<dyn ReleaseFeed>,
        listing: Arc<dyn ChecksumListingSource>,
    ) -> Self {
        Self {
            catalog,
            feed,
            listing,
            cycle: Mutex::new(()),
        }
    }

    /// Check for a newer release of `client_id` and adopt it if found.
    ///
    /// When the remote version is not strictly greater than the catalog's,
    /// only the release tag is fetched. Otherwise the commit and checksum
    /// listing are fetched, every platform entry is rewritten, and the
    /// catalog is replaced in one step. Any error leaves the catalog as it was.
    pub async fn check_for_update(&self, client_id: &str) -> UpdateResult<UpdateCheckResult> {
        let _cycle = self.cycle.lock().await;

        let manifest = self.catalog.snapshot();
        let key = manifest
            .resolve_id(client_id)
            .ok_or_else(|| CatalogError::UnknownClient(client_id.to_string()))?
            .to_string();
        let current_version = self.catalog.get(&key)?.semver(&key)?;

        let tag = self.feed.latest_tag().await?;
        let latest_version = extract_version(&tag).ok_or_else(|| {
            UpdateError::parse("release feed", format!("no version in tag '{}'", tag))
        })?;

        if latest_version <= current_version {
            info!(
                client = %key,
                current = %current_version,
                latest = %latest_version,
                "Client is up to date"
            );
            return Ok(UpdateCheckResult {
                client_id: key,
                latest_version,
                current_version,
                has_update: false,
                commit_hash: None,
                checksums_by_asset: BTreeMap::new(),
                warnings: Vec::new(),
            });
        }

        let sha = self.feed.commit_for_tag(&tag).await?;
        let hash = short_hash(&sha).ok_or_else(|| {
            UpdateError::parse("release feed", format!("invalid commit id '{}'", sha))
        })?;
        let listing = self.listing.fetch_listing().await?;

        let mut updated = (*manifest).clone();
        let entry = updated
            .client_mut(&key)
            .ok_or_else(|| CatalogError::UnknownClient(key.clone()))?;
        let applied = apply_release(entry, &latest_version, &hash, &listing);

        for warning in &applied.warnings {
            warn!(client = %key, "{}", warning);
        }

        self.catalog.replace(updated).await?;

        info!(
            client = %key,
            from = %current_version,
            to = %latest_version,
            commit = %hash,
            warnings = applied.warnings.len(),
            "Catalog advanced to new release"
        );

        Ok(UpdateCheckResult {
            client_id: key,
            latest_version,
            current_version,
            has_update: true,
            commit_hash: Some(hash),
            checksums_by_asset: applied.checksums,
            warnings: applied.warnings,
        })
    }
}

/// Changes made by [`apply_release`].
#[derive(Debug, Default)]
pub(crate) struct AppliedRelease {
    pub(crate) checksums: BTreeMap<String, String>,
    pub(crate) warnings: Vec<UpdateWarning>,
}

/// Rewrite a client entry in place for a new release.
pub(crate) fn apply_release(
    entry: &mut ClientEntry,
    version: &Version,
    hash: &str,
    listing: &ChecksumListing,
) -> AppliedRelease {
    let mut applied = AppliedRelease::default();

    entry.version = version.to_string();
    entry.commit_hash = Some(hash.to_string());

    for (platform, arch, binary) in entry.binaries_mut() {
        let token_warning = |field| UpdateWarning::TokenNotFound {
            platform: platform.to_string(),
            arch: arch.to_string(),
            field,
        };

        if !has_version_token(&binary.download.url) {
            applied.warnings.push(token_warning("download url"));
        }
        if !has_version_token(&binary.download.bin) {
            applied.warnings.push(token_warning("binary path"));
        }

        binary.download.url = rewrite_version_token(&binary.download.url, version, hash).into_owned();
        binary.download.bin = rewrite_version_token(&binary.download.bin, version, hash).into_owned();
        update_sanity_output(&mut binary.commands.sanity.output, version);

        let asset = asset_name(&binary.download.url).to_string();
        match listing.get(&asset) {
            Some(checksum) => {
                binary.download.checksum = checksum.to_string();
                applied.checksums.insert(asset, checksum.to_string());
            }
            None => applied.warnings.push(UpdateWarning::ChecksumNotFound {
                platform: platform.to_string(),
                arch: arch.to_string(),
                asset,
            }),
        }
    }

    applied
}

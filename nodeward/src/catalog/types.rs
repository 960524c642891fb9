//! Catalog document model.
//!
//! Mirrors the `clientBinaries.json` layout:
//!
//! ```text
//! clients
//!   └── <ClientId>
//!         ├── version
//!         ├── commitHash
//!         └── platforms
//!               └── <platform>
//!                     └── <arch>
//!                           ├── download { url, type, bin, checksum }
//!                           └── commands { sanity { args, output } }
//! ```
//!
//! All maps are ordered so that serialization is deterministic.

use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};

use super::error::{CatalogError, CatalogResult};
use crate::platform::HostTarget;
use crate::version::extract_version;

/// Per-platform, per-architecture binaries of one client.
pub type PlatformMap = BTreeMap<String, BTreeMap<String, PlatformBinary>>;

/// The complete catalog of supported clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientManifest {
    pub clients: BTreeMap<String, ClientEntry>,
}

impl ClientManifest {
    /// Parse a manifest from its JSON representation.
    pub fn from_json(content: &str) -> CatalogResult<Self> {
        serde_json::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// Serialize to four-space-indented JSON with a trailing newline.
    ///
    /// Output is byte-identical for equal manifests.
    pub fn to_pretty_json(&self) -> CatalogResult<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        let mut out = String::from_utf8(buf).map_err(|e| CatalogError::Parse(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }

    /// Resolve a client identifier case-insensitively to its stored key.
    pub fn resolve_id(&self, client_id: &str) -> Option<&str> {
        self.clients
            .keys()
            .find(|k| k.eq_ignore_ascii_case(client_id))
            .map(String::as_str)
    }

    /// Look up a client entry case-insensitively.
    pub fn client(&self, client_id: &str) -> Option<&ClientEntry> {
        self.resolve_id(client_id)
            .and_then(|key| self.clients.get(key))
    }

    /// Mutable variant of [`client`](Self::client).
    pub fn client_mut(&mut self, client_id: &str) -> Option<&mut ClientEntry> {
        let key = self.resolve_id(client_id)?.to_string();
        self.clients.get_mut(&key)
    }
}

/// One supported client implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEntry {
    /// Current version, `major.minor.patch`.
    pub version: String,

    /// Short commit identifier of the release the binaries were built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,

    #[serde(default)]
    pub platforms: PlatformMap,
}

impl ClientEntry {
    /// Parsed form of [`version`](Self::version).
    pub fn semver(&self, client_id: &str) -> CatalogResult<Version> {
        extract_version(&self.version).ok_or_else(|| CatalogError::InvalidVersion {
            client: client_id.to_string(),
            version: self.version.clone(),
        })
    }

    /// The binary for a given host, if one is published.
    pub fn binary_for(&self, target: HostTarget) -> Option<&PlatformBinary> {
        self.platforms
            .get(target.platform.as_str())
            .and_then(|archs| archs.get(target.arch.as_str()))
    }

    /// Iterate over every `(platform, arch, binary)` triple.
    pub fn binaries_mut(&mut self) -> impl Iterator<Item = (&str, &str, &mut PlatformBinary)> {
        self.platforms.iter_mut().flat_map(|(platform, archs)| {
            archs
                .iter_mut()
                .map(move |(arch, binary)| (platform.as_str(), arch.as_str(), binary))
        })
    }
}

/// Download and verification metadata for one platform/arch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformBinary {
    pub download: DownloadSpec,

    #[serde(default)]
    pub commands: BinaryCommands,
}

impl PlatformBinary {
    pub fn download_url(&self) -> &str {
        &self.download.url
    }

    /// Path of the executable inside the downloaded archive.
    pub fn bin_path(&self) -> &str {
        &self.download.bin
    }

    pub fn checksum(&self) -> &str {
        &self.download.checksum
    }

    pub fn sanity_command(&self) -> &SanityCommand {
        &self.commands.sanity
    }
}

/// Where to fetch the artifact and how to unpack it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSpec {
    pub url: String,

    #[serde(rename = "type", default)]
    pub archive: ArchiveKind,

    pub bin: String,

    /// Hex-encoded MD5 or SHA-256 of the downloaded artifact.
    #[serde(default, alias = "md5")]
    pub checksum: String,
}

/// Container format of a downloaded artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    /// Gzip-compressed tarball.
    #[default]
    Tar,
    Zip,
    /// The artifact is the executable itself.
    Bin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryCommands {
    #[serde(default)]
    pub sanity: SanityCommand,
}

/// Command run after installation to confirm the binary is what it claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanityCommand {
    #[serde(default)]
    pub args: Vec<String>,

    /// Expected stdout, one entry per line.
    #[serde(default)]
    pub output: Vec<String>,
}

impl SanityCommand {
    pub fn expected_output_lines(&self) -> &[String] {
        &self.output
    }
}

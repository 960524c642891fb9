//! Installation of verified client binaries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::checksum::{checksums_match, digest_file_like};
use super::downloader::ArtifactDownloader;
use super::error::{AcquireError, AcquireResult};
use super::extract::extract_binary;
use super::sanity::{run_sanity, SanityOutcome, DEFAULT_SANITY_TIMEOUT};
use crate::catalog::{ArchiveKind, BinaryCatalog};
use crate::platform::HostTarget;

/// Suffix of the file recording which checksum a binary was verified against.
const VERIFIED_SUFFIX: &str = ".verified";

/// Anything that can hand out the path of a runnable client binary.
pub trait BinarySource: Send + Sync {
    /// Make sure a verified binary for `client_id` is on disk and return it.
    fn ensure_installed<'a>(&'a self, client_id: &'a str) -> BoxFuture<'a, AcquireResult<PathBuf>>;
}

/// Settings for [`BinaryAcquirer`].
#[derive(Debug, Clone)]
pub struct AcquirerConfig {
    /// Root of the installed binaries tree.
    pub install_dir: PathBuf,
    pub sanity_timeout: Duration,
    /// Platform to install for. `None` means the running host.
    pub target: Option<HostTarget>,
}

impl AcquirerConfig {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            sanity_timeout: DEFAULT_SANITY_TIMEOUT,
            target: None,
        }
    }
}

/// Where one client version lives on disk.
///
/// ```text
/// <install_dir>/<client>/<version>/<bin>
/// <install_dir>/<client>/<version>/<bin>.verified
/// ```
#[derive(Debug, Clone)]
struct InstallLayout {
    dir: PathBuf,
    binary: PathBuf,
    sidecar: PathBuf,
}

impl InstallLayout {
    fn new(install_dir: &Path, client: &str, version: &str, bin_path: &str) -> Self {
        let file_name = bin_path
            .rsplit(['/', '\\'])
            .find(|s| !s.is_empty())
            .unwrap_or(client);
        let dir = install_dir.join(client.to_lowercase()).join(version);
        let binary = dir.join(file_name);
        let sidecar = dir.join(format!("{}{}", file_name, VERIFIED_SUFFIX));
        Self {
            dir,
            binary,
            sidecar,
        }
    }

    /// Whether the binary is present and was verified against `checksum`.
    async fn is_verified(&self, checksum: &str) -> bool {
        if !tokio::fs::try_exists(&self.binary).await.unwrap_or(false) {
            return false;
        }
        match tokio::fs::read_to_string(&self.sidecar).await {
            Ok(recorded) => checksums_match(checksum, &recorded),
            Err(_) => false,
        }
    }

    async fn clear(&self) -> std::io::Result<()> {
        for path in [&self.sidecar, &self.binary] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Downloads, verifies, and installs client binaries described by the catalog.
pub struct BinaryAcquirer {
    catalog: Arc<BinaryCatalog>,
    downloader: Arc<dyn ArtifactDownloader>,
    config: AcquirerConfig,
    install_lock: Mutex<()>,
}

impl BinaryAcquirer {
    pub fn new(
        catalog: Arc<BinaryCatalog>,
        downloader: Arc<dyn ArtifactDownloader>,
        config: AcquirerConfig,
    ) -> Self {
        Self {
            catalog,
            downloader,
            config,
            install_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &AcquirerConfig {
        &self.config
    }

    fn target(&self, client: &str) -> AcquireResult<HostTarget> {
        self.config
            .target
            .or_else(HostTarget::current)
            .ok_or_else(|| AcquireError::UnsupportedPlatform {
                client: client.to_string(),
                target: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
            })
    }

    /// Ensure a verified binary for `client_id` is installed and return its path.
    ///
    /// A binary already verified against the catalog's current checksum is
    /// reused. Otherwise the artifact is downloaded and hashed; only when the
    /// digest matches is the executable extracted, marked executable and
    /// moved into place. The sanity command runs last and only warns.
    pub async fn ensure_installed(&self, client_id: &str) -> AcquireResult<PathBuf> {
        let _guard = self.install_lock.lock().await;

        let manifest = self.catalog.snapshot();
        let key = manifest
            .resolve_id(client_id)
            .unwrap_or(client_id)
            .to_string();
        let entry = self.catalog.get(&key)?;
        let target = self.target(&key)?;
        let binary = entry
            .binary_for(target)
            .ok_or_else(|| AcquireError::UnsupportedPlatform {
                client: key.clone(),
                target: target.to_string(),
            })?;

        let layout = InstallLayout::new(
            &self.config.install_dir,
            &key,
            &entry.version,
            binary.bin_path(),
        );

        if layout.is_verified(binary.checksum()).await {
            debug!(client = %key, path = %layout.binary.display(), "Binary already installed");
            return Ok(layout.binary);
        }

        layout.clear().await?;
        tokio::fs::create_dir_all(&layout.dir).await?;

        let url = binary.download_url().to_string();
        let artifact = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(&layout.dir)?;

        info!(client = %key, version = %entry.version, %target, url = %url, "Downloading client binary");
        let bytes = self.downloader.download(&url, artifact.path()).await?;

        let artifact_path = artifact.path().to_path_buf();
        let expected = binary.checksum().to_string();
        let actual = tokio::task::spawn_blocking(move || digest_file_like(&artifact_path, &expected))
            .await
            .map_err(std::io::Error::other)??;

        if !checksums_match(binary.checksum(), &actual) {
            warn!(
                client = %key,
                url = %url,
                expected = %binary.checksum(),
                actual = %actual,
                "Checksum mismatch, discarding artifact"
            );
            drop(artifact);
            return Err(AcquireError::ChecksumMismatch {
                url,
                expected: binary.checksum().to_string(),
                actual,
            });
        }
        debug!(client = %key, bytes, checksum = %actual, "Artifact checksum verified");

        let install = InstallJob {
            layout: layout.clone(),
            kind: binary.download.archive,
            bin: binary.bin_path().to_string(),
            checksum: actual,
        };
        tokio::task::spawn_blocking(move || install.run(artifact))
            .await
            .map_err(std::io::Error::other)??;

        info!(client = %key, path = %layout.binary.display(), "Client binary installed");

        match run_sanity(
            &layout.binary,
            binary.sanity_command(),
            self.config.sanity_timeout,
        )
        .await
        {
            SanityOutcome::Matched | SanityOutcome::Skipped => {}
            SanityOutcome::Mismatch { expected, actual } => warn!(
                client = %key,
                ?expected,
                ?actual,
                "Sanity check output differs; using binary anyway"
            ),
            SanityOutcome::Failed(reason) => warn!(
                client = %key,
                reason = %reason,
                "Sanity check could not run; using binary anyway"
            ),
        }

        Ok(layout.binary)
    }
}

impl BinarySource for BinaryAcquirer {
    fn ensure_installed<'a>(&'a self, client_id: &'a str) -> BoxFuture<'a, AcquireResult<PathBuf>> {
        Box::pin(BinaryAcquirer::ensure_installed(self, client_id))
    }
}

impl std::fmt::Debug for BinaryAcquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryAcquirer")
            .field("config", &self.config)
            .finish()
    }
}

/// Blocking half of an install: extract, mark executable, rename, record.
struct InstallJob {
    layout: InstallLayout,
    kind: ArchiveKind,
    bin: String,
    checksum: String,
}

impl InstallJob {
    fn run(self, artifact: tempfile::NamedTempFile) -> AcquireResult<()> {
        let staged = tempfile::Builder::new()
            .prefix(".staged-")
            .tempfile_in(&self.layout.dir)?;
        extract_binary(artifact.path(), self.kind, &self.bin, staged.path())?;
        drop(artifact);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(staged.path(), std::fs::Permissions::from_mode(0o755))?;
        }

        staged
            .persist(&self.layout.binary)
            .map_err(|e| AcquireError::Io(e.error))?;
        std::fs::write(&self.layout.sidecar, &self.checksum)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::extract::fixtures::write_tar_gz;
    use crate::catalog::fixtures::sample_manifest;
    use crate::platform::{Arch, Platform};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const SCRIPT: &[u8] = b"#!/bin/sh\necho Bith\necho 1.4.2\n";

    struct MockDownloader {
        payload: Vec<u8>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockDownloader {
        fn serving(payload: Vec<u8>) -> Self {
            Self {
                payload,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                payload: Vec::new(),
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    impl ArtifactDownloader for MockDownloader {
        fn download<'a>(&'a self, url: &'a str, dest: &'a Path) -> BoxFuture<'a, AcquireResult<u64>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    return Err(AcquireError::DownloadFailed {
                        url: url.to_string(),
                        reason: "connection refused".to_string(),
                    });
                }
                tokio::fs::write(dest, &self.payload).await?;
                Ok(self.payload.len() as u64)
            })
        }
    }

    fn tarball(dir: &Path) -> Vec<u8> {
        let path = dir.join("artifact.tar.gz");
        write_tar_gz(&path, &[("bith-linux-amd64-1.4.2-abc12345/bith", SCRIPT, 0o644)]);
        std::fs::read(path).unwrap()
    }

    fn digest(bytes: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(bytes))
    }

    struct Harness {
        _temp: TempDir,
        install_dir: PathBuf,
        catalog: Arc<BinaryCatalog>,
    }

    fn harness(checksum: &str) -> Harness {
        let temp = TempDir::new().unwrap();
        let mut manifest = sample_manifest();
        let bith = manifest.client_mut("bith").unwrap();
        for (_, _, binary) in bith.binaries_mut() {
            binary.download.checksum = checksum.to_uppercase();
        }
        let catalog = Arc::new(BinaryCatalog::with_manifest(
            temp.path().join("clientBinaries.json"),
            manifest,
        ));
        Harness {
            install_dir: temp.path().join("binaries"),
            _temp: temp,
            catalog,
        }
    }

    fn acquirer(h: &Harness, downloader: Arc<MockDownloader>, target: HostTarget) -> BinaryAcquirer {
        let mut config = AcquirerConfig::new(&h.install_dir);
        config.target = Some(target);
        config.sanity_timeout = Duration::from_secs(5);
        BinaryAcquirer::new(h.catalog.clone(), downloader, config)
    }

    fn linux() -> HostTarget {
        HostTarget::new(Platform::Linux, Arch::X64)
    }

    fn files_in(dir: &Path) -> Vec<String> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_installs_verified_binary() {
        let scratch = TempDir::new().unwrap();
        let payload = tarball(scratch.path());
        let h = harness(&digest(&payload));
        let downloader = Arc::new(MockDownloader::serving(payload));
        let acquirer = acquirer(&h, downloader.clone(), linux());

        let path = acquirer.ensure_installed("bith").await.unwrap();

        assert_eq!(path, h.install_dir.join("bith").join("1.4.2").join("bith"));
        assert_eq!(std::fs::read(&path).unwrap(), SCRIPT);
        let mut names = files_in(path.parent().unwrap());
        names.sort();
        assert_eq!(names, vec!["bith", "bith.verified"]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test]
    async fn test_verified_binary_is_reused() {
        let scratch = TempDir::new().unwrap();
        let payload = tarball(scratch.path());
        let h = harness(&digest(&payload));
        let downloader = Arc::new(MockDownloader::serving(payload));
        let acquirer = acquirer(&h, downloader.clone(), linux());

        let first = acquirer.ensure_installed("Bith").await.unwrap();
        let second = acquirer.ensure_installed("bith").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_leaves_nothing_behind() {
        let scratch = TempDir::new().unwrap();
        let payload = tarball(scratch.path());
        let h = harness(&"ab".repeat(32));
        let downloader = Arc::new(MockDownloader::serving(payload));
        let acquirer = acquirer(&h, downloader, linux());

        let result = acquirer.ensure_installed("bith").await;

        assert!(matches!(result, Err(AcquireError::ChecksumMismatch { .. })));
        let dir = h.install_dir.join("bith").join("1.4.2");
        assert!(files_in(&dir).is_empty(), "left behind: {:?}", files_in(&dir));
    }

    #[tokio::test]
    async fn test_stale_verification_triggers_reinstall() {
        let scratch = TempDir::new().unwrap();
        let payload = tarball(scratch.path());
        let h = harness(&digest(&payload));
        let downloader = Arc::new(MockDownloader::serving(payload));
        let acquirer = acquirer(&h, downloader.clone(), linux());

        let path = acquirer.ensure_installed("bith").await.unwrap();
        std::fs::write(path.with_file_name("bith.verified"), "ff".repeat(32)).unwrap();

        acquirer.ensure_installed("bith").await.unwrap();
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_raw_binary_artifact() {
        let h = harness(&digest(SCRIPT));
        let mut manifest = (*h.catalog.snapshot()).clone();
        for (_, _, binary) in manifest.client_mut("bith").unwrap().binaries_mut() {
            binary.download.archive = ArchiveKind::Bin;
            binary.download.bin = "bith".to_string();
        }
        let catalog = Arc::new(BinaryCatalog::with_manifest(h.catalog.path(), manifest));
        let mut config = AcquirerConfig::new(&h.install_dir);
        config.target = Some(linux());
        let acquirer = BinaryAcquirer::new(
            catalog,
            Arc::new(MockDownloader::serving(SCRIPT.to_vec())),
            config,
        );

        let path = acquirer.ensure_installed("bith").await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), SCRIPT);
    }

    fn raw_binary_acquirer(h: &Harness, payload: &[u8], checksum: &str) -> BinaryAcquirer {
        let mut manifest = (*h.catalog.snapshot()).clone();
        for (_, _, binary) in manifest.client_mut("bith").unwrap().binaries_mut() {
            binary.download.archive = ArchiveKind::Bin;
            binary.download.bin = "bith".to_string();
            binary.download.checksum = checksum.to_string();
        }
        let catalog = Arc::new(BinaryCatalog::with_manifest(h.catalog.path(), manifest));
        let mut config = AcquirerConfig::new(&h.install_dir);
        config.target = Some(linux());
        config.sanity_timeout = Duration::from_secs(5);
        BinaryAcquirer::new(
            catalog,
            Arc::new(MockDownloader::serving(payload.to_vec())),
            config,
        )
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sanity_mismatch_still_installs() {
        const OTHER_VERSION: &[u8] = b"#!/bin/sh\necho Bith\necho 9.9.9\n";
        let h = harness(&digest(SCRIPT));
        let acquirer = raw_binary_acquirer(&h, OTHER_VERSION, &digest(OTHER_VERSION));

        let path = acquirer.ensure_installed("bith").await.unwrap();

        assert_eq!(path, h.install_dir.join("bith").join("1.4.2").join("bith"));
        assert_eq!(std::fs::read(&path).unwrap(), OTHER_VERSION);
        assert_eq!(
            std::fs::read_to_string(path.with_file_name("bith.verified")).unwrap(),
            digest(OTHER_VERSION)
        );
    }

    #[tokio::test]
    async fn test_md5_checksum_verifies_artifact() {
        use md5::{Digest, Md5};
        let md5 = hex::encode(Md5::digest(SCRIPT));
        let h = harness(&digest(SCRIPT));
        let acquirer = raw_binary_acquirer(&h, SCRIPT, &md5.to_uppercase());

        let path = acquirer.ensure_installed("bith").await.unwrap();

        assert_eq!(
            std::fs::read_to_string(path.with_file_name("bith.verified")).unwrap(),
            md5
        );
        let fresh = harness(&digest(SCRIPT));
        assert!(matches!(
            raw_binary_acquirer(&fresh, b"tampered", &md5)
                .ensure_installed("bith")
                .await,
            Err(AcquireError::ChecksumMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_platform() {
        let h = harness(&digest(SCRIPT));
        let downloader = Arc::new(MockDownloader::serving(SCRIPT.to_vec()));
        let acquirer = acquirer(
            &h,
            downloader.clone(),
            HostTarget::new(Platform::Win, Arch::X64),
        );

        let result = acquirer.ensure_installed("bith").await;

        assert!(matches!(
            result,
            Err(AcquireError::UnsupportedPlatform { target, .. }) if target == "win/x64"
        ));
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_download_failure_propagates() {
        let h = harness(&digest(SCRIPT));
        let acquirer = acquirer(&h, Arc::new(MockDownloader::failing()), linux());

        let result = acquirer.ensure_installed("bith").await;

        assert!(matches!(result, Err(AcquireError::DownloadFailed { .. })));
        assert!(files_in(&h.install_dir.join("bith").join("1.4.2")).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_client() {
        let h = harness(&digest(SCRIPT));
        let acquirer = acquirer(&h, Arc::new(MockDownloader::failing()), linux());
        assert!(matches!(
            acquirer.ensure_installed("parity").await,
            Err(AcquireError::Catalog(_))
        ));
    }
}

//! Binary acquisition.
//!
//! Turns a catalog entry into a runnable executable on disk:
//!
//! 1. Resolve the host platform and architecture.
//! 2. Reuse an install already verified against the current checksum.
//! 3. Otherwise download the artifact and hash it. A mismatch deletes the
//!    artifact and fails; nothing is extracted.
//! 4. Extract the executable, mark it executable, and rename it into place.
//! 5. Run the sanity command. Mismatches are logged, not fatal.

mod acquirer;
mod checksum;
mod downloader;
mod error;
mod extract;
mod sanity;

pub use acquirer::{AcquirerConfig, BinaryAcquirer, BinarySource};
pub use checksum::{checksums_match, digest_file, digest_file_like, DigestAlgorithm};
pub use downloader::{ArtifactDownloader, HttpDownloader, DEFAULT_DOWNLOAD_TIMEOUT};
pub use error::{AcquireError, AcquireResult};
pub use sanity::{run_sanity, SanityOutcome, DEFAULT_SANITY_TIMEOUT};

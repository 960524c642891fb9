//! Artifact digests.
//!
//! Catalog checksums are hex digests. Release listings from object storage
//! carry MD5, hand-maintained catalogs may carry SHA-256; the algorithm is
//! picked from the length of the expected digest.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use md5::Md5;
use sha2::{Digest, Sha256};

/// Hash function behind a catalog checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    /// The algorithm whose hex digest has the length of `checksum`.
    pub fn for_checksum(checksum: &str) -> Option<Self> {
        match checksum.trim().len() {
            32 => Some(Self::Md5),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        })
    }
}

/// Digest of a file as lowercase hex.
pub fn digest_file(path: &Path, algorithm: DigestAlgorithm) -> std::io::Result<String> {
    match algorithm {
        DigestAlgorithm::Md5 => hash_file::<Md5>(path),
        DigestAlgorithm::Sha256 => hash_file::<Sha256>(path),
    }
}

/// Digest of a file with the algorithm `expected` was produced by.
///
/// Expectations of unknown length are hashed with SHA-256 and so never match.
pub fn digest_file_like(path: &Path, expected: &str) -> std::io::Result<String> {
    let algorithm = DigestAlgorithm::for_checksum(expected).unwrap_or(DigestAlgorithm::Sha256);
    digest_file(path, algorithm)
}

fn hash_file<D: Digest>(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Case-insensitive digest comparison. An empty expectation never matches.
pub fn checksums_match(expected: &str, actual: &str) -> bool {
    let expected = expected.trim();
    !expected.is_empty() && expected.eq_ignore_ascii_case(actual.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ABC_MD5: &str = "900150983cd24fb0d6963f7d28e17f72";
    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    fn abc_file(temp: &TempDir) -> std::path::PathBuf {
        let path = temp.path().join("abc");
        std::fs::write(&path, b"abc").unwrap();
        path
    }

    #[test]
    fn test_known_values() {
        let temp = TempDir::new().unwrap();
        let path = abc_file(&temp);
        assert_eq!(digest_file(&path, DigestAlgorithm::Md5).unwrap(), ABC_MD5);
        assert_eq!(digest_file(&path, DigestAlgorithm::Sha256).unwrap(), ABC_SHA256);
    }

    #[test]
    fn test_algorithm_follows_expected_length() {
        let temp = TempDir::new().unwrap();
        let path = abc_file(&temp);
        assert_eq!(digest_file_like(&path, ABC_MD5).unwrap(), ABC_MD5);
        assert_eq!(
            digest_file_like(&path, &ABC_SHA256.to_uppercase()).unwrap(),
            ABC_SHA256
        );
        assert_eq!(digest_file_like(&path, "abcdef").unwrap(), ABC_SHA256);
        assert_eq!(DigestAlgorithm::for_checksum(""), None);
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(digest_file(&temp.path().join("absent"), DigestAlgorithm::Md5).is_err());
    }

    #[test]
    fn test_match_ignores_case() {
        assert!(checksums_match("BA7816BF", "ba7816bf"));
        assert!(checksums_match(" ba7816bf\n", "BA7816BF"));
        assert!(!checksums_match("ba7816bf", "ba7816be"));
    }

    #[test]
    fn test_empty_expectation_never_matches() {
        assert!(!checksums_match("", ""));
        assert!(!checksums_match("  ", "ba7816bf"));
    }
}

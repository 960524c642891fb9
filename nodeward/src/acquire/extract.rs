//! Pull a single executable out of a downloaded artifact.
//!
//! These functions do blocking I/O and are called from `spawn_blocking`.

use std::fs::File;
use std::io;
use std::path::Path;

use flate2::read::GzDecoder;

use super::error::{AcquireError, AcquireResult};
use crate::catalog::ArchiveKind;

/// Normalize an archive member path for comparison.
fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").trim_start_matches('/').to_string()
}

/// Write the member `bin` of `artifact` to `dest`.
pub(crate) fn extract_binary(
    artifact: &Path,
    kind: ArchiveKind,
    bin: &str,
    dest: &Path,
) -> AcquireResult<u64> {
    let extract_err = |reason: String| AcquireError::Extract {
        bin: bin.to_string(),
        reason,
    };

    match kind {
        ArchiveKind::Bin => Ok(std::fs::copy(artifact, dest)?),
        ArchiveKind::Tar => {
            let wanted = normalize(bin);
            let mut archive = tar::Archive::new(GzDecoder::new(File::open(artifact)?));
            for entry in archive.entries().map_err(|e| extract_err(e.to_string()))? {
                let mut entry = entry.map_err(|e| extract_err(e.to_string()))?;
                let name = entry
                    .path()
                    .map_err(|e| extract_err(e.to_string()))?
                    .to_string_lossy()
                    .into_owned();
                if normalize(&name) == wanted {
                    let mut out = File::create(dest)?;
                    return Ok(io::copy(&mut entry, &mut out)?);
                }
            }
            Err(extract_err("not present in archive".to_string()))
        }
        ArchiveKind::Zip => {
            let wanted = normalize(bin);
            let mut archive =
                zip::ZipArchive::new(File::open(artifact)?).map_err(|e| extract_err(e.to_string()))?;
            for index in 0..archive.len() {
                let mut member = archive
                    .by_index(index)
                    .map_err(|e| extract_err(e.to_string()))?;
                if normalize(member.name()) == wanted {
                    let mut out = File::create(dest)?;
                    return Ok(io::copy(&mut member, &mut out)?);
                }
            }
            Err(extract_err("not present in archive".to_string()))
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::path::Path;

    /// Write a gzip tarball with the given `(path, contents, mode)` members.
    pub(crate) fn write_tar_gz(dest: &Path, members: &[(&str, &[u8], u32)]) {
        let file = std::fs::File::create(dest).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (path, contents, mode) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, path, *contents).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap().flush().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::write_tar_gz;
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_extract_from_tar_gz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bith.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("bith-1.5.0-def67890/README", b"docs", 0o644),
                ("bith-1.5.0-def67890/bith", b"#!/bin/sh\n", 0o755),
            ],
        );

        let dest = temp.path().join("out");
        let bytes =
            extract_binary(&archive, ArchiveKind::Tar, "bith-1.5.0-def67890/bith", &dest).unwrap();

        assert_eq!(bytes, 10);
        assert_eq!(std::fs::read(&dest).unwrap(), b"#!/bin/sh\n");
    }

    #[test]
    fn test_extract_missing_member() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bith.tar.gz");
        write_tar_gz(&archive, &[("other/bith", b"x", 0o755)]);

        let result = extract_binary(
            &archive,
            ArchiveKind::Tar,
            "bith-1.5.0-def67890/bith",
            &temp.path().join("out"),
        );
        assert!(matches!(result, Err(AcquireError::Extract { .. })));
    }

    #[test]
    fn test_extract_from_zip_with_backslash_path() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bith.zip");
        {
            let file = std::fs::File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            zip.start_file(
                "bith-1.5.0-def67890/bith.exe",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
            zip.write_all(b"MZ").unwrap();
            zip.finish().unwrap();
        }

        let dest = temp.path().join("bith.exe");
        extract_binary(
            &archive,
            ArchiveKind::Zip,
            "bith-1.5.0-def67890\\bith.exe",
            &dest,
        )
        .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"MZ");
    }

    #[test]
    fn test_raw_binary_is_copied() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("bith");
        std::fs::write(&artifact, b"ELF").unwrap();
        let dest = temp.path().join("installed");

        extract_binary(&artifact, ArchiveKind::Bin, "ignored", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"ELF");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("./a/b"), "a/b");
        assert_eq!(normalize("a\\b.exe"), "a/b.exe");
    }
}

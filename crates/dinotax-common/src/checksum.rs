//! SHA-256 fingerprints for snapshot files

use crate::error::{DinotaxError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Hex-encoded SHA-256 of an in-memory buffer
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Compute the SHA-256 checksum of any readable source
pub fn compute_checksum<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
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

/// Compute the SHA-256 checksum of a file
pub fn compute_file_checksum(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    compute_checksum(&mut file)
}

/// Verify a file against an expected checksum
pub fn verify_file_checksum(path: impl AsRef<Path>, expected: &str) -> Result<()> {
    let path = path.as_ref();
    let actual = compute_file_checksum(path)?;
    if actual == expected {
        Ok(())
    } else {
        Err(DinotaxError::ChecksumMismatch {
            file: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HELLO_WORLD_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_sha256_hex() {
        assert_eq!(sha256_hex(b"hello world"), HELLO_WORLD_SHA256);
    }

    #[test]
    fn test_compute_checksum_matches_buffer_hash() {
        let mut cursor = Cursor::new(b"hello world");
        assert_eq!(compute_checksum(&mut cursor).unwrap(), HELLO_WORLD_SHA256);
    }

    #[test]
    fn test_verify_file_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(&path, b"hello world").unwrap();

        assert!(verify_file_checksum(&path, HELLO_WORLD_SHA256).is_ok());

        let err = verify_file_checksum(&path, "deadbeef").unwrap_err();
        assert!(matches!(err, DinotaxError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify_file_checksum(dir.path().join("taxa.json"), HELLO_WORLD_SHA256).unwrap_err();
        assert!(matches!(err, DinotaxError::Io(_)));
    }
}

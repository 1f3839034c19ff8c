//! SHA-256 verification of a finished output file.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::worker::BUFFER_SIZE;
use crate::error::{TransferError, TransferResult};

/// Lowercase hex SHA-256 of the file at `path`.
pub fn file_sha256(path: &Path) -> TransferResult<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Check `path` against an expected hex digest (case-insensitive).
///
/// On mismatch the file is left in place and
/// [`TransferError::ChecksumMismatch`] is returned.
pub fn verify_sha256(path: &Path, expected: &str) -> TransferResult<()> {
    let actual = file_sha256(path)?;
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(TransferError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.trim().to_ascii_lowercase(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_file_sha256() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        fs::write(&path, b"hello world").unwrap();

        assert_eq!(file_sha256(&path).unwrap(), HELLO_WORLD);
    }

    #[test]
    fn test_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty");
        fs::write(&path, b"").unwrap();

        assert_eq!(
            file_sha256(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_verify_accepts_uppercase() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        fs::write(&path, b"hello world").unwrap();

        assert!(verify_sha256(&path, &HELLO_WORLD.to_uppercase()).is_ok());
    }

    #[test]
    fn test_verify_mismatch_keeps_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        fs::write(&path, b"hello world!").unwrap();

        let err = verify_sha256(&path, HELLO_WORLD).unwrap_err();

        assert!(matches!(err, TransferError::ChecksumMismatch { .. }));
        assert!(err.retains_output());
        assert!(path.exists());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = file_sha256(&temp.path().join("absent")).unwrap_err();
        assert!(matches!(err, TransferError::Io(_)));
    }
}

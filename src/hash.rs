//! xxHash-based content comparison
//!
//! Files are hashed in fixed-size chunks so memory stays bounded no matter
//! how large the file is.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::trace;
use xxhash_rust::xxh3::Xxh3;

/// Read buffer size for hashing (256KB)
const CHUNK_SIZE: usize = 256 * 1024;

/// Compute the 128-bit content digest of a file
pub fn compute_file_hash(path: &Path) -> Result<u128> {
    let file = File::open(path).map_err(|e| Error::HashComputation {
        path: path.to_path_buf(),
        message: format!("Failed to open file: {}", e),
    })?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| Error::HashComputation {
            path: path.to_path_buf(),
            message: format!("Failed to read file: {}", e),
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hash = hasher.digest128();
    trace!(?path, ?hash, "Computed file hash");
    Ok(hash)
}

/// Whether two files have byte-identical content
///
/// Files of different length are reported as different without hashing.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    let len_a = fs::metadata(a)
        .map_err(|e| Error::HashComputation {
            path: a.to_path_buf(),
            message: e.to_string(),
        })?
        .len();
    let len_b = fs::metadata(b)
        .map_err(|e| Error::HashComputation {
            path: b.to_path_buf(),
            message: e.to_string(),
        })?
        .len();
    if len_a != len_b {
        return Ok(false);
    }

    Ok(compute_file_hash(a)? == compute_file_hash(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_with(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_same_content_same_hash() {
        let file1 = temp_with(b"test content");
        let file2 = temp_with(b"test content");

        let hash1 = compute_file_hash(file1.path()).unwrap();
        let hash2 = compute_file_hash(file2.path()).unwrap();
        assert_eq!(hash1, hash2);
        assert!(files_identical(file1.path(), file2.path()).unwrap());
    }

    #[test]
    fn test_different_content_same_length() {
        let file1 = temp_with(b"content 1");
        let file2 = temp_with(b"content 2");

        assert_ne!(
            compute_file_hash(file1.path()).unwrap(),
            compute_file_hash(file2.path()).unwrap()
        );
        assert!(!files_identical(file1.path(), file2.path()).unwrap());
    }

    #[test]
    fn test_different_length_is_different() {
        let file1 = temp_with(b"short");
        let file2 = temp_with(b"a little longer");
        assert!(!files_identical(file1.path(), file2.path()).unwrap());
    }

    #[test]
    fn test_content_larger_than_chunk() {
        let big = vec![7u8; CHUNK_SIZE * 2 + 11];
        let file1 = temp_with(&big);
        let mut other = big.clone();
        *other.last_mut().unwrap() = 8;
        let file2 = temp_with(&other);

        assert!(files_identical(file1.path(), file1.path()).unwrap());
        assert!(!files_identical(file1.path(), file2.path()).unwrap());
    }

    #[test]
    fn test_missing_file_is_error() {
        let file = temp_with(b"x");
        let missing = file.path().with_extension("missing");
        assert!(files_identical(file.path(), &missing).is_err());
    }
}

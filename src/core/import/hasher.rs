//! Exact content hashing (MD5).

use crate::error::ImportError;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

const BUFFER_SIZE: usize = 64 * 1024;

/// Streams files through MD5.
///
/// Owned by the import worker; the read buffer is reused across files.
#[derive(Debug)]
pub struct ContentHasher {
    buffer: Vec<u8>,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            buffer: vec![0; BUFFER_SIZE],
        }
    }

    /// Lowercase hex MD5 of a file's contents
    pub fn hash_file(&mut self, path: &Path) -> Result<String, ImportError> {
        let io_error = |source| ImportError::HashIo {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(io_error)?;
        let mut context = md5::Context::new();
        loop {
            match file.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => context.consume(&self.buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_error(e)),
            }
        }

        Ok(format!("{:x}", context.compute()))
    }

    /// Lowercase hex MD5 of an in-memory buffer
    pub fn hash_bytes(bytes: &[u8]) -> String {
        format!("{:x}", md5::compute(bytes))
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn known_digest() {
        assert_eq!(
            ContentHasher::hash_bytes(b"hello world"),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    #[test]
    fn file_and_bytes_agree() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let mut hasher = ContentHasher::new();
        assert_eq!(
            hasher.hash_file(&path).unwrap(),
            ContentHasher::hash_bytes(&data)
        );
    }

    #[test]
    fn missing_file_is_hash_io_error() {
        let mut hasher = ContentHasher::new();
        let err = hasher.hash_file(Path::new("/nonexistent/file.png")).unwrap_err();
        assert!(matches!(err, ImportError::HashIo { .. }));
        assert!(err.to_string().contains("/nonexistent/file.png"));
    }
}

//! Where an import comes from, and how remote sources are fetched.

use crate::error::ImportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A local file or a remote URL to import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportSource {
    File(PathBuf),
    Url(Url),
}

impl ImportSource {
    /// Treat `input` as a URL if it parses as http(s), otherwise as a path
    pub fn parse(input: &str) -> Self {
        match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => ImportSource::Url(url),
            _ => ImportSource::File(PathBuf::from(input)),
        }
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportSource::File(path) => write!(f, "{}", path.display()),
            ImportSource::Url(url) => write!(f, "{url}"),
        }
    }
}

impl From<PathBuf> for ImportSource {
    fn from(path: PathBuf) -> Self {
        ImportSource::File(path)
    }
}

impl From<Url> for ImportSource {
    fn from(url: Url) -> Self {
        ImportSource::Url(url)
    }
}

/// Fetches remote sources to local files
pub trait Downloader: Send + Sync {
    /// Download `url` into `destination`, reporting progress in `[0, 1]`
    /// when the size is known.
    fn download(
        &self,
        url: &Url,
        destination: &Path,
        progress: &dyn Fn(f32),
    ) -> Result<(), ImportError>;
}

const DOWNLOAD_CHUNK: usize = 64 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Blocking HTTP downloader
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, ImportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("media-library/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ImportError::Download {
                url: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    fn fetch(&self, url: &Url, destination: &Path, progress: &dyn Fn(f32)) -> Result<(), ImportError> {
        let download_error = |reason: String| ImportError::Download {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| download_error(e.to_string()))?;

        let total = response.content_length().filter(|&len| len > 0);
        let mut file = File::create(destination).map_err(|e| download_error(e.to_string()))?;
        let mut buffer = vec![0; DOWNLOAD_CHUNK];
        let mut received: u64 = 0;

        loop {
            let n = response
                .read(&mut buffer)
                .map_err(|e| download_error(e.to_string()))?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n])
                .map_err(|e| download_error(e.to_string()))?;
            received += n as u64;
            if let Some(total) = total {
                progress(received as f32 / total as f32);
            }
        }

        file.flush().map_err(|e| download_error(e.to_string()))?;
        debug!("Downloaded {} bytes from {}", received, url);
        Ok(())
    }
}

impl Downloader for HttpDownloader {
    fn download(
        &self,
        url: &Url,
        destination: &Path,
        progress: &dyn Fn(f32),
    ) -> Result<(), ImportError> {
        let result = self.fetch(url, destination, progress);
        if result.is_err() && destination.exists() {
            if let Err(e) = fs::remove_file(destination) {
                warn!("Failed to remove partial download {}: {}", destination.display(), e);
            }
        }
        result
    }
}

/// Pick a fresh file name in `dir` for a download of `url`.
///
/// Uses the last path segment of the URL; if that file already exists a
/// numeric suffix is added before the extension (`cat.jpg` → `cat-1.jpg`).
pub fn download_target(dir: &Path, url: &Url) -> PathBuf {
    let name = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .unwrap_or("download")
        .to_string();

    let candidate = dir.join(&name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(&name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.clone());
    let extension = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()));

    (1u32..)
        .map(|n| dir.join(format!("{stem}-{n}{}", extension.as_deref().unwrap_or(""))))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn parse_distinguishes_urls_and_paths() {
        assert!(matches!(
            ImportSource::parse("https://example.com/a.png"),
            ImportSource::Url(_)
        ));
        assert_eq!(
            ImportSource::parse("/photos/a.png"),
            ImportSource::File(PathBuf::from("/photos/a.png"))
        );
        assert!(matches!(
            ImportSource::parse("C:\\photos\\a.png"),
            ImportSource::File(_)
        ));
    }

    #[test]
    fn download_target_uses_last_segment() {
        let dir = assert_fs::TempDir::new().unwrap();
        let url = Url::parse("https://example.com/images/cat.jpg?size=large").unwrap();
        assert_eq!(download_target(dir.path(), &url), dir.path().join("cat.jpg"));
    }

    #[test]
    fn download_target_avoids_existing_files() {
        let dir = assert_fs::TempDir::new().unwrap();
        dir.child("cat.jpg").touch().unwrap();
        dir.child("cat-1.jpg").touch().unwrap();

        let url = Url::parse("https://example.com/cat.jpg").unwrap();
        assert_eq!(download_target(dir.path(), &url), dir.path().join("cat-2.jpg"));
    }

    #[test]
    fn download_target_without_path() {
        let dir = assert_fs::TempDir::new().unwrap();
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(download_target(dir.path(), &url), dir.path().join("download"));
    }
}

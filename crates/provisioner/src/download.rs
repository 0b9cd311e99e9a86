//! Download primitive.
//!
//! [`HttpDownloader`] streams a URL to a local file with a blocking `ureq`
//! agent. It never retries: a failed download is reported once and the
//! partial file is removed.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Maximum download size (2 GB covers the largest SDK archives).
const MAX_DOWNLOAD_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// File name used when a URL has no usable last segment.
pub const DEFAULT_FILE_NAME: &str = "download";

/// Something that fetches a URL into a local file.
pub trait Downloader: Send + Sync {
    /// Download `url` to `dest`, optionally sending an `Authorization`
    /// header, and return the path written.
    fn download(&self, url: &str, dest: &Path, auth_header: Option<&str>) -> Result<PathBuf>;
}

/// Blocking HTTP(S) downloader.
///
/// # Example
///
/// ```no_run
/// use provisioner::download::{Downloader, HttpDownloader};
/// use std::path::Path;
///
/// let downloader = HttpDownloader::new();
/// let path = downloader
///     .download(
///         "https://nodejs.org/dist/v20.11.0/node-v20.11.0-linux-x64.tar.gz",
///         Path::new("/tmp/node.tar.gz"),
///         None,
///     )
///     .unwrap();
/// println!("saved to {}", path.display());
/// ```
pub struct HttpDownloader {
    agent: ureq::Agent,
    max_size: u64,
}

impl HttpDownloader {
    /// Create a downloader with the default size limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            max_size: MAX_DOWNLOAD_SIZE,
        }
    }

    /// Override the maximum accepted body size in bytes.
    #[must_use]
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    fn fetch(&self, url: &str, dest: &Path, auth_header: Option<&str>) -> Result<u64> {
        let mut request = self
            .agent
            .get(url)
            .header("User-Agent", concat!("provisioner/", env!("CARGO_PKG_VERSION")));
        if let Some(auth) = auth_header {
            request = request.header("Authorization", auth);
        }

        let mut response = request.call()?;
        let mut reader = response
            .body_mut()
            .with_config()
            .limit(self.max_size)
            .reader();

        let file = File::create(dest).map_err(|e| Error::io(dest, e))?;
        let mut out = BufWriter::new(file);
        let written = copy_body(&mut reader, &mut out, dest)?;
        out.flush().map_err(|e| Error::io(dest, e))?;
        Ok(written)
    }
}

/// Copy a response body into `out`.
///
/// Read failures are network errors; write failures are I/O errors on
/// `dest` so a full disk is not reported as a flaky connection.
fn copy_body(reader: &mut impl Read, out: &mut impl Write, dest: &Path) -> Result<u64> {
    let mut buf = vec![0u8; 64 * 1024];
    let mut written = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(written),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::http(format!("failed to read response body: {e}"), None));
            }
        };
        out.write_all(&buf[..n]).map_err(|e| Error::io(dest, e))?;
        written += n as u64;
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path, auth_header: Option<&str>) -> Result<PathBuf> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        log::debug!("Downloading {} to {}", url, dest.display());
        match self.fetch(url, dest, auth_header) {
            Ok(bytes) => {
                log::debug!("Downloaded {} bytes from {}", bytes, url);
                Ok(dest.to_path_buf())
            }
            Err(e) => {
                let _ = fs::remove_file(dest);
                Err(e)
            }
        }
    }
}

/// Last path segment of a URL, without query string or fragment.
///
/// Keeps the archive suffix so extraction can dispatch on it. Falls back
/// to [`DEFAULT_FILE_NAME`] when the URL ends in `/` or has no path.
///
/// # Example
///
/// ```
/// use provisioner::download::file_name_from_url;
///
/// assert_eq!(
///     file_name_from_url("https://example.com/dl/tool-1.2.zip?token=abc"),
///     "tool-1.2.zip"
/// );
/// assert_eq!(file_name_from_url("https://example.com/"), "download");
/// ```
#[must_use]
pub fn file_name_from_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    let path = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| {
            rest.split_once('/').map_or("", |(_, path)| path)
        });

    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name.to_string(),
        _ => DEFAULT_FILE_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"))
        }
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "no space left"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_copy_body_counts_bytes() {
        let mut out = Vec::new();
        let written = copy_body(&mut &b"archive bytes"[..], &mut out, Path::new("a.tgz")).unwrap();
        assert_eq!(written, 13);
        assert_eq!(out, b"archive bytes");
    }

    #[test]
    fn test_copy_body_read_failure_is_network_error() {
        let err = copy_body(&mut FailingReader, &mut Vec::new(), Path::new("a.tgz")).unwrap_err();
        assert!(matches!(err, Error::Http { status: None, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_copy_body_write_failure_is_io_error_on_dest() {
        let dest = Path::new("/scratch/a.tgz");
        let err = copy_body(&mut &b"archive bytes"[..], &mut FullDisk, dest).unwrap_err();
        match &err {
            Error::Io { path, .. } => assert_eq!(path, dest),
            other => panic!("Expected Io error, got {other:?}"),
        }
        assert_eq!(err.category(), ErrorCategory::Permission);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_file_name_from_url_plain() {
        assert_eq!(
            file_name_from_url("https://nodejs.org/dist/v20.11.0/node-v20.11.0-linux-x64.tar.gz"),
            "node-v20.11.0-linux-x64.tar.gz"
        );
    }

    #[test]
    fn test_file_name_from_url_strips_query_and_fragment() {
        assert_eq!(
            file_name_from_url("https://example.com/a/tool.7z?sig=1&x=2#frag"),
            "tool.7z"
        );
    }

    #[test]
    fn test_file_name_from_url_defaults() {
        assert_eq!(file_name_from_url("https://example.com"), DEFAULT_FILE_NAME);
        assert_eq!(file_name_from_url("https://example.com/dir/"), DEFAULT_FILE_NAME);
        assert_eq!(file_name_from_url("https://example.com/.."), DEFAULT_FILE_NAME);
        assert_eq!(file_name_from_url(""), DEFAULT_FILE_NAME);
    }

    #[test]
    fn test_downloader_default() {
        let downloader = HttpDownloader::default();
        assert_eq!(downloader.max_size, MAX_DOWNLOAD_SIZE);
        let small = HttpDownloader::new().with_max_size(1024);
        assert_eq!(small.max_size, 1024);
    }

    #[test]
    fn test_download_unreachable_host_removes_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("nested").join("tool.tar.gz");

        // Port 9 (discard) on localhost is expected to refuse connections.
        let result = HttpDownloader::new().download("http://127.0.0.1:9/tool.tar.gz", &dest, None);
        assert!(result.is_err());
        assert!(!dest.exists());
    }
}

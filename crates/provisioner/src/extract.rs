//! Archive extraction primitives.
//!
//! [`extract`] picks an extractor from the archive's file-name suffix (see
//! [`ArchiveKind`]) and never falls back to another format on failure.
//! [`ArchiveExtractor`] implements the three formats:
//!
//! - tar: plain, gzip or zstd streams (compression detected from magic bytes)
//! - zip: via the `zip` crate
//! - 7z: by running an external `7z`/`7za`/`7zr` binary

use crate::error::{Error, Result};
use crate::types::ArchiveKind;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::Command;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Executables tried, in order, for 7z archives.
const SEVEN_ZIP_BINARIES: [&str; 3] = ["7z", "7za", "7zr"];

/// Unpacks archives into a destination directory.
///
/// Each method returns the directory the archive was unpacked into.
pub trait Extractor: Send + Sync {
    /// Unpack a tar stream.
    fn extract_tar(&self, archive: &Path, dest: &Path) -> Result<PathBuf>;

    /// Unpack a zip archive.
    fn extract_zip(&self, archive: &Path, dest: &Path) -> Result<PathBuf>;

    /// Unpack a 7-Zip archive.
    fn extract_7z(&self, archive: &Path, dest: &Path) -> Result<PathBuf>;
}

/// Unpack `archive` into `dest` with the extractor matching its suffix.
pub fn extract(extractor: &dyn Extractor, archive: &Path, dest: &Path) -> Result<PathBuf> {
    let kind = ArchiveKind::from_path(archive);
    log::debug!("Extracting {} as {} into {}", archive.display(), kind, dest.display());

    match kind {
        ArchiveKind::SevenZip => extractor.extract_7z(archive, dest),
        ArchiveKind::Zip => extractor.extract_zip(archive, dest),
        ArchiveKind::Tar => extractor.extract_tar(archive, dest),
    }
}

/// Default extractor backed by `tar`, `flate2`, `zstd`, `zip` and an
/// external 7z binary.
#[derive(Debug, Clone, Default)]
pub struct ArchiveExtractor {
    seven_zip: Option<PathBuf>,
}

impl ArchiveExtractor {
    /// Create an extractor that looks up 7z on `PATH` when needed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit 7z executable instead of searching `PATH`.
    #[must_use]
    pub fn with_seven_zip(mut self, binary: impl Into<PathBuf>) -> Self {
        self.seven_zip = Some(binary.into());
        self
    }

    fn seven_zip_binary(&self, archive: &Path) -> Result<PathBuf> {
        if let Some(binary) = &self.seven_zip {
            return Ok(binary.clone());
        }
        SEVEN_ZIP_BINARIES
            .iter()
            .find_map(|name| which::which(name).ok())
            .ok_or_else(|| {
                Error::extraction(archive, "no 7z executable (7z, 7za, 7zr) found on PATH")
            })
    }
}

impl Extractor for ArchiveExtractor {
    fn extract_tar(&self, archive: &Path, dest: &Path) -> Result<PathBuf> {
        prepare_dest(dest)?;

        let reader = open_tar_stream(archive)?;
        let mut tar = tar::Archive::new(reader);
        tar.set_preserve_permissions(true);
        tar.set_overwrite(true);
        tar.unpack(dest).map_err(|e| Error::extraction(archive, e))?;

        Ok(dest.to_path_buf())
    }

    fn extract_zip(&self, archive: &Path, dest: &Path) -> Result<PathBuf> {
        prepare_dest(dest)?;

        let file = File::open(archive).map_err(|e| Error::io(archive, e))?;
        let mut zip =
            zip::ZipArchive::new(BufReader::new(file)).map_err(|e| Error::extraction(archive, e))?;
        zip.extract(dest).map_err(|e| Error::extraction(archive, e))?;

        Ok(dest.to_path_buf())
    }

    fn extract_7z(&self, archive: &Path, dest: &Path) -> Result<PathBuf> {
        prepare_dest(dest)?;

        let binary = self.seven_zip_binary(archive)?;
        log::debug!("Running {} on {}", binary.display(), archive.display());

        let output = Command::new(&binary)
            .arg("x")
            .arg("-y")
            .arg("-bd")
            .arg(format!("-o{}", dest.display()))
            .arg(archive)
            .output()
            .map_err(|e| {
                Error::extraction(archive, format!("failed to run {}: {}", binary.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(Error::extraction(
                archive,
                format!("{} exited with {}: {}", binary.display(), output.status, detail.trim()),
            ));
        }

        Ok(dest.to_path_buf())
    }
}

fn prepare_dest(dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))
}

/// Open a tar file, transparently decompressing gzip or zstd.
fn open_tar_stream(archive: &Path) -> Result<Box<dyn Read>> {
    let mut magic = [0u8; 4];
    let read = {
        let mut file = File::open(archive).map_err(|e| Error::io(archive, e))?;
        read_prefix(&mut file, &mut magic).map_err(|e| Error::io(archive, e))?
    };

    let file = BufReader::new(File::open(archive).map_err(|e| Error::io(archive, e))?);
    if read >= 2 && magic[..2] == GZIP_MAGIC {
        log::debug!("{} is gzip-compressed", archive.display());
        Ok(Box::new(GzDecoder::new(file)))
    } else if read >= 4 && magic == ZSTD_MAGIC {
        log::debug!("{} is zstd-compressed", archive.display());
        let decoder =
            zstd::stream::read::Decoder::with_buffer(file).map_err(|e| Error::extraction(archive, e))?;
        Ok(Box::new(decoder))
    } else {
        Ok(Box::new(file))
    }
}

fn read_prefix(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Records which extractor method was called.
    #[derive(Default)]
    struct RecordingExtractor {
        calls: Mutex<Vec<ArchiveKind>>,
    }

    impl RecordingExtractor {
        fn calls(&self) -> Vec<ArchiveKind> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, kind: ArchiveKind, dest: &Path) -> Result<PathBuf> {
            self.calls.lock().unwrap().push(kind);
            Ok(dest.to_path_buf())
        }
    }

    impl Extractor for RecordingExtractor {
        fn extract_tar(&self, _archive: &Path, dest: &Path) -> Result<PathBuf> {
            self.record(ArchiveKind::Tar, dest)
        }
        fn extract_zip(&self, _archive: &Path, dest: &Path) -> Result<PathBuf> {
            self.record(ArchiveKind::Zip, dest)
        }
        fn extract_7z(&self, _archive: &Path, dest: &Path) -> Result<PathBuf> {
            self.record(ArchiveKind::SevenZip, dest)
        }
    }

    fn tar_bytes(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data, mode) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_dispatch_zip_only_calls_zip() {
        let extractor = RecordingExtractor::default();
        extract(&extractor, Path::new("/tmp/tool.zip"), Path::new("/tmp/out")).unwrap();
        assert_eq!(extractor.calls(), vec![ArchiveKind::Zip]);
    }

    #[test]
    fn test_dispatch_7z_only_calls_7z() {
        let extractor = RecordingExtractor::default();
        extract(&extractor, Path::new("/tmp/tool.7z"), Path::new("/tmp/out")).unwrap();
        assert_eq!(extractor.calls(), vec![ArchiveKind::SevenZip]);
    }

    #[test]
    fn test_dispatch_other_suffixes_call_tar() {
        let extractor = RecordingExtractor::default();
        for name in ["tool.tar.gz", "tool.tgz", "tool.tar.xz", "tool", "tool.exe"] {
            extract(&extractor, &Path::new("/tmp").join(name), Path::new("/tmp/out")).unwrap();
        }
        assert_eq!(extractor.calls(), vec![ArchiveKind::Tar; 5]);
    }

    #[test]
    fn test_extract_tar_gz() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("demo.tar.gz");
        let data = tar_bytes(&[("demo-1.2/bin/demo", b"#!/bin/sh\necho hi\n", 0o755)]);
        fs::write(&archive, gzip(&data)).unwrap();

        let dest = tmp.path().join("out");
        let out = ArchiveExtractor::new().extract_tar(&archive, &dest).unwrap();
        assert_eq!(out, dest);

        let bin = dest.join("demo-1.2").join("bin").join("demo");
        assert_eq!(fs::read(&bin).unwrap(), b"#!/bin/sh\necho hi\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&bin).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_extract_plain_tar() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("demo.tar");
        fs::write(&archive, tar_bytes(&[("README", b"plain", 0o644)])).unwrap();

        let dest = tmp.path().join("out");
        ArchiveExtractor::new().extract_tar(&archive, &dest).unwrap();
        assert_eq!(fs::read(dest.join("README")).unwrap(), b"plain");
    }

    #[test]
    fn test_extract_tar_zst() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("demo.tar.zst");
        let data = tar_bytes(&[("bin/demo", b"zstd payload", 0o755)]);
        fs::write(&archive, zstd::stream::encode_all(&data[..], 0).unwrap()).unwrap();

        let dest = tmp.path().join("out");
        ArchiveExtractor::new().extract_tar(&archive, &dest).unwrap();
        assert_eq!(fs::read(dest.join("bin").join("demo")).unwrap(), b"zstd payload");
    }

    #[test]
    fn test_extract_tar_garbage_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("demo.tar.gz");
        fs::write(&archive, gzip(b"definitely not a tar stream, but long enough to read")).unwrap();

        let result = ArchiveExtractor::new().extract_tar(&archive, &tmp.path().join("out"));
        assert!(matches!(result, Err(Error::Extraction { .. })));
    }

    #[test]
    fn test_extract_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("demo.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            zip.start_file("demo/bin/demo.exe", options).unwrap();
            zip.write_all(b"zip binary content").unwrap();
            zip.finish().unwrap();
        }

        let dest = tmp.path().join("out");
        ArchiveExtractor::new().extract_zip(&archive, &dest).unwrap();
        assert_eq!(
            fs::read(dest.join("demo").join("bin").join("demo.exe")).unwrap(),
            b"zip binary content"
        );
    }

    #[test]
    fn test_extract_zip_invalid_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("demo.zip");
        fs::write(&archive, b"not a zip").unwrap();

        let result = ArchiveExtractor::new().extract_zip(&archive, &tmp.path().join("out"));
        assert!(matches!(result, Err(Error::Extraction { .. })));
    }

    #[test]
    fn test_extract_zip_does_not_escape_dest() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("evil.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("../escaped", options).unwrap();
            zip.write_all(b"nope").unwrap();
            zip.finish().unwrap();
        }

        let dest = tmp.path().join("nested").join("out");
        let _ = ArchiveExtractor::new().extract_zip(&archive, &dest);
        assert!(!tmp.path().join("nested").join("escaped").exists());
    }

    #[test]
    fn test_extract_7z_missing_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("demo.7z");
        fs::write(&archive, b"7z\xbc\xaf\x27\x1c").unwrap();

        let extractor = ArchiveExtractor::new().with_seven_zip(tmp.path().join("no-such-7z"));
        let result = extractor.extract_7z(&archive, &tmp.path().join("out"));
        match result {
            Err(Error::Extraction { message, .. }) => assert!(message.contains("failed to run")),
            other => panic!("Expected Extraction error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_missing_archive_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result =
            ArchiveExtractor::new().extract_tar(&tmp.path().join("missing.tar"), &tmp.path().join("out"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_read_prefix_short_input() {
        let mut buf = [0u8; 4];
        let n = read_prefix(&mut &b"ab"[..], &mut buf).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&buf[..2], b"ab");
    }
}

//! Executable search path mutation.
//!
//! Adding a tool to `PATH` is a process-wide, additive side effect with no
//! undo: it lasts until the process exits. On a CI runner the directory is
//! also appended to the file named by `GITHUB_PATH`, which makes later steps
//! of the same job inherit it.
//!
//! The mutation goes through the [`PathRegistry`] trait so that callers can
//! swap in [`RecordingPath`] for tests and dry runs.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Environment variable naming the runner's path file.
pub const ENV_GITHUB_PATH: &str = "GITHUB_PATH";

/// Something that makes directories discoverable for executables.
pub trait PathRegistry: Send + Sync {
    /// Prepend `dir` to the executable search path.
    fn prepend(&self, dir: &Path) -> Result<()>;
}

/// The real process `PATH`, plus the runner's path file when present.
#[derive(Debug, Clone, Default)]
pub struct ProcessPath {
    path_file: Option<PathBuf>,
}

impl ProcessPath {
    /// Use `GITHUB_PATH` from the environment, if set.
    #[must_use]
    pub fn from_env() -> Self {
        let path_file = std::env::var_os(ENV_GITHUB_PATH)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self { path_file }
    }

    /// Write added directories to an explicit path file.
    #[must_use]
    pub fn with_path_file(path_file: impl Into<PathBuf>) -> Self {
        Self {
            path_file: Some(path_file.into()),
        }
    }

    /// Path file directories are appended to, if any.
    #[must_use]
    pub fn path_file(&self) -> Option<&Path> {
        self.path_file.as_deref()
    }
}

impl PathRegistry for ProcessPath {
    fn prepend(&self, dir: &Path) -> Result<()> {
        let current = std::env::var_os("PATH").unwrap_or_default();
        let joined = prepend_to(&current, dir)?;

        if let Some(file) = &self.path_file {
            let mut out = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .map_err(|e| Error::io(file, e))?;
            writeln!(out, "{}", dir.display()).map_err(|e| Error::io(file, e))?;
        }

        // SAFETY: provisioning is single-threaded; callers must not read or
        // write the environment from other threads while `ensure` runs.
        unsafe { std::env::set_var("PATH", joined) };

        log::info!("Added to PATH: {}", dir.display());
        Ok(())
    }
}

/// Build a new `PATH` value with `dir` first.
pub fn prepend_to(current: &OsString, dir: &Path) -> Result<OsString> {
    let entries = std::iter::once(dir.to_path_buf()).chain(std::env::split_paths(current));
    std::env::join_paths(entries).map_err(|e| {
        Error::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        )
    })
}

/// In-memory registry that records prepended directories.
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingPath {
    added: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingPath {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories prepended so far, oldest first.
    #[must_use]
    pub fn added(&self) -> Vec<PathBuf> {
        self.added
            .lock()
            .map(|added| added.clone())
            .unwrap_or_default()
    }
}

impl PathRegistry for RecordingPath {
    fn prepend(&self, dir: &Path) -> Result<()> {
        let mut added = self
            .added
            .lock()
            .map_err(|_| Error::environment("path recorder poisoned", None))?;
        added.push(dir.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepend_to_puts_dir_first() {
        let current = std::env::join_paths([PathBuf::from("/usr/bin"), PathBuf::from("/bin")])
            .unwrap();
        let joined = prepend_to(&current, Path::new("/opt/tool/bin")).unwrap();
        let entries: Vec<PathBuf> = std::env::split_paths(&joined).collect();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("/opt/tool/bin"),
                PathBuf::from("/usr/bin"),
                PathBuf::from("/bin"),
            ]
        );
    }

    #[test]
    fn test_prepend_to_empty_path() {
        let joined = prepend_to(&OsString::new(), Path::new("/opt/tool/bin")).unwrap();
        let entries: Vec<PathBuf> = std::env::split_paths(&joined).collect();
        assert_eq!(entries[0], PathBuf::from("/opt/tool/bin"));
    }

    #[cfg(unix)]
    #[test]
    fn test_prepend_to_rejects_separator_in_dir() {
        let result = prepend_to(&OsString::from("/usr/bin"), Path::new("/opt/a:b"));
        assert!(result.is_err());
    }

    #[test]
    fn test_recording_path_records_in_order() {
        let registry = RecordingPath::new();
        let shared = registry.clone();
        registry.prepend(Path::new("/a")).unwrap();
        registry.prepend(Path::new("/b")).unwrap();
        assert_eq!(shared.added(), vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    /// Run `f`, then put `PATH` back the way it was.
    fn restoring_path<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = std::env::var_os("PATH");
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { std::env::set_var("PATH", v) },
            None => unsafe { std::env::remove_var("PATH") },
        }
        result
    }

    #[test]
    fn test_process_path_updates_env_and_path_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path_file = tmp.path().join("github_path");
        let dir = tmp.path().join("tool").join("bin");
        let before = std::env::var_os("PATH");

        restoring_path(|| {
            let registry = ProcessPath::with_path_file(&path_file);
            registry.prepend(&dir).unwrap();

            let contents = std::fs::read_to_string(&path_file).unwrap();
            assert_eq!(contents, format!("{}\n", dir.display()));

            let path = std::env::var_os("PATH").unwrap();
            let first = std::env::split_paths(&path).next().unwrap();
            assert_eq!(first, dir);
        });

        assert_eq!(std::env::var_os("PATH"), before);
    }

    #[cfg(unix)]
    #[test]
    fn test_unjoinable_dir_leaves_path_file_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let path_file = tmp.path().join("github_path");

        let registry = ProcessPath::with_path_file(&path_file);
        assert!(registry.prepend(Path::new("/opt/a:b")).is_err());
        assert!(!path_file.exists());
    }
}

//! On-disk tool cache.
//!
//! Layout, rooted at `RUNNER_TOOL_CACHE` by default:
//!
//! ```text
//! <root>/<name>/<version>/<arch>/          extracted tool
//! <root>/<name>/<version>/<arch>.complete  written last
//! ```
//!
//! An entry only counts as present once its `.complete` marker exists, so
//! a copy interrupted by an error or a crash is never returned by
//! [`ToolCache::find`]. The cache never evicts anything.

use crate::error::{Error, Result};
use std::fs;
use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// A tool cache rooted at a directory, for one architecture.
#[derive(Debug, Clone)]
pub struct ToolCache {
    root: PathBuf,
    arch: String,
}

impl ToolCache {
    /// Create a cache rooted at `root` holding entries for `arch`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, arch: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            arch: arch.into(),
        }
    }

    /// Root directory of the cache.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Architecture segment of every entry.
    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Directory an entry for `(name, version)` lives in.
    #[must_use]
    pub fn entry_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version).join(&self.arch)
    }

    fn marker(&self, name: &str, version: &str) -> PathBuf {
        self.root
            .join(name)
            .join(version)
            .join(format!("{}.complete", self.arch))
    }

    /// Look up a completed entry.
    ///
    /// `version` must already be normalized; matching is exact. Returns
    /// `None` for names or versions that are not a single path component.
    #[must_use]
    pub fn find(&self, name: &str, version: &str) -> Option<PathBuf> {
        if let Err(e) = check_key(name, version) {
            log::debug!("Not looking up {} {}: {}", name, version, e);
            return None;
        }

        let dir = self.entry_dir(name, version);
        if dir.is_dir() && self.marker(name, version).is_file() {
            log::debug!("Found {} {} in tool cache at {}", name, version, dir.display());
            Some(dir)
        } else {
            log::debug!("{} {} not in tool cache", name, version);
            None
        }
    }

    /// List every completed version of `name`, oldest first.
    ///
    /// Dot-separated components compare numerically when both are numbers,
    /// so `10.0.0` sorts after `2.0.0`.
    pub fn find_all_versions(&self, name: &str) -> Result<Vec<String>> {
        check_component("tool name", name)?;
        let tool_dir = self.root.join(name);
        if !tool_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&tool_dir).map_err(|e| Error::io(&tool_dir, e))? {
            let entry = entry.map_err(|e| Error::io(&tool_dir, e))?;
            let version = entry.file_name().to_string_lossy().to_string();
            if self.find(name, &version).is_some() {
                versions.push(version);
            }
        }
        versions.sort_by(|a, b| compare_versions(a, b));
        Ok(versions)
    }

    /// Copy an extracted tool directory into the cache.
    ///
    /// Any existing entry for the same key is replaced. The marker is
    /// written only after the copy succeeded.
    pub fn cache_dir(&self, source: &Path, name: &str, version: &str) -> Result<PathBuf> {
        check_key(name, version)?;
        if !source.is_dir() {
            return Err(Error::io(
                source,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source is not a directory"),
            ));
        }

        let dest = self.entry_dir(name, version);
        let marker = self.marker(name, version);
        log::debug!("Caching {} into {}", source.display(), dest.display());

        remove_if_exists(&marker)?;
        if dest.exists() {
            fs::remove_dir_all(&dest).map_err(|e| Error::io(&dest, e))?;
        }
        fs::create_dir_all(&dest).map_err(|e| Error::io(&dest, e))?;

        copy_tree(source, &dest)?;

        fs::write(&marker, b"").map_err(|e| Error::io(&marker, e))?;
        Ok(dest)
    }
}

/// Reject cache keys that are empty or would leave their directory level.
fn check_key(name: &str, version: &str) -> Result<()> {
    check_component("tool name", name)?;
    check_component("version", version)
}

/// Require `value` to be exactly one normal path component.
pub(crate) fn check_component(what: &str, value: &str) -> Result<()> {
    let mut components = Path::new(value).components();
    let single = match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => part == value,
        _ => false,
    };
    if single {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "{what} '{value}' must be a single path component"
        )))
    }
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let order = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if order != Ordering::Equal {
                    return order;
                }
            }
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Recursively copy `src` into the existing directory `dest`.
///
/// Symlinks are recreated on Unix and copied as files elsewhere.
fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            Error::io(path, e.into())
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::io(entry.path(), std::io::Error::other(e)))?;
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| Error::io(&target, e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> Result<()> {
    let link = fs::read_link(src).map_err(|e| Error::io(src, e))?;
    std::os::unix::fs::symlink(&link, target).map_err(|e| Error::io(target, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> Result<()> {
    if src.is_dir() {
        fs::create_dir_all(target).map_err(|e| Error::io(target, e))?;
        return copy_tree(src, target);
    }
    fs::copy(src, target)
        .map(|_| ())
        .map_err(|e| Error::io(target, e))
}

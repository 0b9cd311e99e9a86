//! Core types for tool provisioning.
//!
//! This module contains the data model shared by the provisioning pipeline:
//! tool identities, platform information, archive kinds, release metadata
//! and the outcome of an `ensure` call.

use crate::version::NormalizedVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A tool name and the version the caller asked for.
///
/// `name` is an opaque cache namespace (e.g. "node", "helm"). `version` is
/// kept exactly as supplied; use [`ToolIdentity::normalized`] for cache keys.
///
/// # Example
///
/// ```
/// use provisioner::ToolIdentity;
///
/// let id = ToolIdentity::new("helm", "3.14");
/// assert_eq!(id.normalized().as_str(), "3.14.0");
/// assert_eq!(id.to_string(), "helm@3.14");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolIdentity {
    /// Cache namespace key.
    pub name: String,
    /// Version as supplied by the caller.
    pub version: String,
}

impl ToolIdentity {
    /// Create a new identity.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// The normalized version used as the cache key.
    #[must_use]
    pub fn normalized(&self) -> NormalizedVersion {
        NormalizedVersion::new(&self.version)
    }
}

impl fmt::Display for ToolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Target platform for binary downloads.
///
/// Represents a target platform with OS, architecture, and triple information
/// used for URL templates and the cache key's arch segment.
///
/// # Example
///
/// ```
/// use provisioner::Platform;
///
/// let platform = Platform::new("macos", "aarch64", "aarch64-apple-darwin");
/// assert!(platform.is_macos());
/// assert_eq!(platform.node_os(), "darwin");
/// assert_eq!(platform.node_arch(), "arm64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system (e.g., "macos", "linux", "windows").
    pub os: String,
    /// CPU architecture (e.g., "aarch64", "x86_64").
    pub arch: String,
    /// Platform triple (e.g., "aarch64-apple-darwin").
    pub triple: String,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>, triple: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
            triple: triple.into(),
        }
    }

    /// Check if this platform is macOS.
    #[must_use]
    pub fn is_macos(&self) -> bool {
        self.os == "macos"
    }

    /// Check if this platform is Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// OS name in the spelling most CI tool distributions use
    /// (`linux`, `darwin`, `win32`).
    #[must_use]
    pub fn node_os(&self) -> &str {
        match self.os.as_str() {
            "macos" => "darwin",
            "windows" => "win32",
            other => other,
        }
    }

    /// Architecture in the spelling most CI tool distributions use
    /// (`x64`, `arm64`, `x86`, `arm`).
    #[must_use]
    pub fn node_arch(&self) -> &str {
        match self.arch.as_str() {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            "x86" => "x86",
            "arm" => "arm",
            other => other,
        }
    }

    /// Conventional archive extension for this platform.
    ///
    /// Returns `zip` on Windows and `tar.gz` elsewhere.
    #[must_use]
    pub fn archive_ext(&self) -> &'static str {
        if self.is_windows() { "zip" } else { "tar.gz" }
    }

    /// Executable suffix for this platform (`.exe` on Windows).
    #[must_use]
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() { ".exe" } else { "" }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.triple)
    }
}

/// Archive format, chosen by file-name suffix.
///
/// The dispatch is closed and ordered: `.7z`, then `.zip`, then everything
/// else is treated as a tar stream. File contents are never sniffed to pick
/// the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// 7-Zip archive.
    SevenZip,
    /// Zip archive.
    Zip,
    /// Tar stream (plain, gzip or zstd compressed).
    Tar,
}

impl ArchiveKind {
    /// Pick the archive kind for a path.
    ///
    /// # Example
    ///
    /// ```
    /// use provisioner::ArchiveKind;
    ///
    /// assert_eq!(ArchiveKind::from_path("node.7z"), ArchiveKind::SevenZip);
    /// assert_eq!(ArchiveKind::from_path("node.zip"), ArchiveKind::Zip);
    /// assert_eq!(ArchiveKind::from_path("node.tar.xz"), ArchiveKind::Tar);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let name = path.as_ref().to_string_lossy();
        if name.ends_with(".7z") {
            Self::SevenZip
        } else if name.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Tar
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SevenZip => "7z",
            Self::Zip => "zip",
            Self::Tar => "tar",
        };
        write!(f, "{s}")
    }
}

/// A release published on a hosting service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Release tag (e.g., "v3.14.0").
    pub tag: String,
    /// Available assets.
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Find an asset by exact name.
    #[must_use]
    pub fn find_asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// A downloadable file within a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// Asset name (e.g., "helm-v3.14.0-linux-amd64.tar.gz").
    pub name: String,
    /// Browser download URL.
    pub download_url: String,
}

/// Result of a successful `ensure` call.
#[derive(Debug, Clone)]
pub struct EnsureOutcome {
    /// Tool and version as requested.
    pub tool: ToolIdentity,
    /// Version used as the cache key.
    pub version: NormalizedVersion,
    /// Cache entry directory (the extracted tool).
    pub tool_root: PathBuf,
    /// Directory that was prepended to PATH.
    pub bin_dir: PathBuf,
    /// Whether the tool was already cached.
    pub cache_hit: bool,
}

impl fmt::Display for EnsureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let how = if self.cache_hit { "cached" } else { "installed" };
        write!(
            f,
            "{} {} {} at {}",
            self.tool.name,
            self.version,
            how,
            self.bin_dir.display()
        )
    }
}

//! # provisioner
//!
//! Make a specific version of a named tool available on PATH, downloading
//! it at most once per normalized version.
//!
//! This crate provides:
//! - Version normalization to three dot-separated components
//! - URL resolution from templates or GitHub release assets
//! - Download, extraction (tar, tar.gz, tar.zst, zip, 7z) and caching
//! - A runner-compatible tool cache (`RUNNER_TOOL_CACHE`, `RUNNER_TEMP`)
//! - PATH mutation, mirrored to `GITHUB_PATH` on CI runners
//!
//! ## Example
//!
//! ```no_run
//! use provisioner::Provisioner;
//! use provisioner::resolver::TemplateResolver;
//!
//! let protoc = Provisioner::builder("protoc")
//!     .resolver(TemplateResolver::new(
//!         "https://github.com/protocolbuffers/protobuf/releases/download/v{version}/protoc-{version}-linux-x86_64.zip",
//!     )?)
//!     .bin_subpath("bin")
//!     .build()?;
//!
//! let outcome = protoc.ensure("27.1")?;
//! println!("{} ({})", outcome, if outcome.cache_hit { "hit" } else { "miss" });
//! # Ok::<(), provisioner::Error>(())
//! ```
//!
//! ## Cache Layout
//!
//! ```text
//! $RUNNER_TOOL_CACHE/
//! └── protoc/
//!     └── 27.1.0/
//!         ├── x64/          # extracted archive contents
//!         └── x64.complete  # written last
//! ```
//!
//! An entry without its `.complete` marker is treated as absent, so an
//! interrupted acquisition is retried from scratch.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod download;
pub mod env;
pub mod error;
pub mod extract;
pub mod path;
pub mod platform;
pub mod provisioner;
pub mod resolver;
pub mod types;
pub mod version;

pub use error::{Error, ErrorCategory, Result, Stage};
pub use provisioner::{Provisioner, ProvisionerBuilder};
pub use types::{ArchiveKind, EnsureOutcome, Platform, Release, ReleaseAsset, ToolIdentity};
pub use version::{NormalizedVersion, normalize};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ToolCache;
    use crate::path::RecordingPath;

    #[test]
    fn test_closure_resolver_sees_raw_version() {
        let tmp = tempfile::tempdir().unwrap();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let record = seen.clone();

        let provisioner = Provisioner::builder("demo")
            .resolver(move |version: &str, platform: &Platform| -> Result<String> {
                record.lock().unwrap().push(version.to_string());
                Err(Error::Configuration(format!("no build for {platform}")))
            })
            .platform(Platform::new("linux", "aarch64", "aarch64-unknown-linux-gnu"))
            .cache(ToolCache::new(tmp.path().join("cache"), "arm64"))
            .temp_dir(tmp.path().join("temp"))
            .path_registry(RecordingPath::new())
            .build()
            .unwrap();

        let err = provisioner.ensure("1.2").unwrap_err();
        assert!(matches!(
            err,
            Error::Acquisition {
                stage: Stage::Resolve,
                ..
            }
        ));
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!err.is_retryable());
        assert_eq!(*seen.lock().unwrap(), vec!["1.2".to_string()]);
    }

    #[test]
    fn test_reexports() {
        assert_eq!(normalize("7"), "7.0.0");
        assert_eq!(NormalizedVersion::new("7.1").as_str(), "7.1.0");
        assert_eq!(ArchiveKind::from_path("a.7z"), ArchiveKind::SevenZip);
    }
}

//! The cache-or-acquire entry point.
//!
//! [`Provisioner::ensure`] runs, for one tool:
//!
//! ```text
//! normalize version -> cache lookup -> [miss] resolve URL -> download
//!   -> extract -> register in cache -> join bin subpath -> prepend to PATH
//! ```
//!
//! Every step is blocking and nothing is retried. A failed acquisition
//! leaves no cache entry behind, so calling `ensure` again re-attempts the
//! whole pipeline.

use crate::cache::{self, ToolCache};
use crate::download::{Downloader, HttpDownloader, file_name_from_url};
use crate::env;
use crate::error::{Error, Result, Stage};
use crate::extract::{self, ArchiveExtractor, Extractor};
use crate::path::{PathRegistry, ProcessPath};
use crate::platform;
use crate::resolver::UrlResolver;
use crate::types::{EnsureOutcome, Platform, ToolIdentity};
use crate::version::NormalizedVersion;
use std::path::{Component, Path, PathBuf};

/// Makes one named tool available on PATH, downloading it at most once per
/// normalized version.
///
/// Built with [`Provisioner::builder`]; the only required part is a
/// [`UrlResolver`].
///
/// # Example
///
/// ```no_run
/// use provisioner::Provisioner;
/// use provisioner::resolver::TemplateResolver;
///
/// let node = Provisioner::builder("node")
///     .resolver(TemplateResolver::new(
///         "https://nodejs.org/dist/v{normalized}/node-v{normalized}-{node_os}-{node_arch}.{ext}",
///     )?)
///     .bin_subpath("node-v20.11.0-linux-x64/bin")
///     .build()?;
///
/// let outcome = node.ensure("20.11")?;
/// println!("{outcome}");
/// # Ok::<(), provisioner::Error>(())
/// ```
pub struct Provisioner {
    name: String,
    bin_subpath: PathBuf,
    auth_header: Option<String>,
    platform: Platform,
    resolver: Box<dyn UrlResolver>,
    downloader: Box<dyn Downloader>,
    extractor: Box<dyn Extractor>,
    cache: ToolCache,
    temp_dir: PathBuf,
    path: Box<dyn PathRegistry>,
}

impl Provisioner {
    /// Start building a provisioner for the tool `name`.
    pub fn builder(name: impl Into<String>) -> ProvisionerBuilder {
        ProvisionerBuilder::new(name)
    }

    /// Tool name (cache namespace).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative directory inside the tool root that is added to PATH.
    #[must_use]
    pub fn bin_subpath(&self) -> &Path {
        &self.bin_subpath
    }

    /// Platform URLs are resolved for.
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The tool cache in use.
    #[must_use]
    pub fn cache(&self) -> &ToolCache {
        &self.cache
    }

    /// Look up `version` in the cache without acquiring it.
    #[must_use]
    pub fn find(&self, version: &str) -> Option<PathBuf> {
        self.cache
            .find(&self.name, NormalizedVersion::new(version).as_str())
    }

    /// Make `version` available on PATH, acquiring it on a cache miss.
    ///
    /// The PATH mutation lasts for the rest of the process and is not
    /// undone on later failures.
    pub fn ensure(&self, version: &str) -> Result<EnsureOutcome> {
        let tool = ToolIdentity::new(&self.name, version);
        let normalized = tool.normalized();

        let (tool_root, cache_hit) = match self.cache.find(&self.name, normalized.as_str()) {
            Some(path) => {
                log::info!("{} is cached under {}", tool, path.display());
                (path, true)
            }
            None => {
                log::info!("{} not found in tool cache, acquiring", tool);
                (self.acquire(version)?, false)
            }
        };

        let bin_dir = self.bin_dir(&tool_root);
        self.path.prepend(&bin_dir)?;
        log::debug!("Prepended {} for {}", bin_dir.display(), tool);

        Ok(EnsureOutcome {
            tool,
            version: normalized,
            tool_root,
            bin_dir,
            cache_hit,
        })
    }

    /// Download, extract and cache `version`, returning the cache entry.
    ///
    /// Failures are wrapped in [`Error::Acquisition`] with the requested
    /// version and the stage that failed; the category is that of the
    /// cause. Scratch files are removed before returning.
    pub fn acquire(&self, version: &str) -> Result<PathBuf> {
        let normalized = NormalizedVersion::new(version);
        cache::check_component("version", normalized.as_str())
            .map_err(self.failed(version, Stage::Resolve))?;

        let url = self
            .resolver
            .resolve_download_url(version, &self.platform)
            .map_err(self.failed(version, Stage::Resolve))?;
        if url.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "resolver for '{}' returned an empty URL for version {}",
                self.name, version
            )));
        }
        log::debug!("Resolved {} {} to {}", self.name, version, url);

        let download_dir = self
            .scratch_dir("download-")
            .map_err(self.failed(version, Stage::Download))?;
        let target = download_dir.path().join(file_name_from_url(&url));
        let archive = self
            .downloader
            .download(&url, &target, self.auth_header.as_deref())
            .map_err(self.failed(version, Stage::Download))?;

        let extract_dir = self
            .scratch_dir("extract-")
            .map_err(self.failed(version, Stage::Extract))?;
        let extracted = extract::extract(self.extractor.as_ref(), &archive, extract_dir.path())
            .map_err(self.failed(version, Stage::Extract))?;

        let cached = self
            .cache
            .cache_dir(&extracted, &self.name, normalized.as_str())
            .map_err(self.failed(version, Stage::Cache))?;

        log::info!("Cached {} {} at {}", self.name, normalized, cached.display());
        Ok(cached)
    }

    fn failed(&self, version: &str, stage: Stage) -> impl FnOnce(Error) -> Error {
        let tool = self.name.clone();
        let version = version.to_string();
        move |source| Error::acquisition(tool, version, stage, source)
    }

    fn bin_dir(&self, tool_root: &Path) -> PathBuf {
        if self.bin_subpath.as_os_str().is_empty() {
            tool_root.to_path_buf()
        } else {
            tool_root.join(&self.bin_subpath)
        }
    }

    fn scratch_dir(&self, prefix: &str) -> Result<tempfile::TempDir> {
        std::fs::create_dir_all(&self.temp_dir).map_err(|e| {
            Error::environment(
                format!("cannot create temp directory {}: {}", self.temp_dir.display(), e),
                Some(self.temp_dir.clone()),
            )
        })?;
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&self.temp_dir)
            .map_err(|e| {
                Error::environment(
                    format!("cannot create scratch directory in {}: {}", self.temp_dir.display(), e),
                    Some(self.temp_dir.clone()),
                )
            })
    }
}

/// Builder for [`Provisioner`].
///
/// Anything not set is taken from the environment when [`build`] runs:
/// the platform is detected, the cache lives under `RUNNER_TOOL_CACHE`,
/// scratch space under `RUNNER_TEMP`, downloads go over HTTP and PATH
/// changes go to the real process (and `GITHUB_PATH`).
///
/// [`build`]: ProvisionerBuilder::build
pub struct ProvisionerBuilder {
    name: String,
    bin_subpath: PathBuf,
    auth_header: Option<String>,
    platform: Option<Platform>,
    resolver: Option<Box<dyn UrlResolver>>,
    downloader: Option<Box<dyn Downloader>>,
    extractor: Option<Box<dyn Extractor>>,
    cache: Option<ToolCache>,
    temp_dir: Option<PathBuf>,
    path: Option<Box<dyn PathRegistry>>,
}

impl ProvisionerBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bin_subpath: PathBuf::from("."),
            auth_header: None,
            platform: None,
            resolver: None,
            downloader: None,
            extractor: None,
            cache: None,
            temp_dir: None,
            path: None,
        }
    }

    /// Set the download URL resolver. Required.
    #[must_use]
    pub fn resolver(mut self, resolver: impl UrlResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Set the directory, relative to the extracted tool, to add to PATH.
    /// Defaults to `.`.
    #[must_use]
    pub fn bin_subpath(mut self, subpath: impl Into<PathBuf>) -> Self {
        self.bin_subpath = subpath.into();
        self
    }

    /// Send an `Authorization` header with the download request.
    #[must_use]
    pub fn auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = Some(header.into());
        self
    }

    /// Override the detected platform.
    #[must_use]
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Use a custom downloader.
    #[must_use]
    pub fn downloader(mut self, downloader: impl Downloader + 'static) -> Self {
        self.downloader = Some(Box::new(downloader));
        self
    }

    /// Use a custom extractor.
    #[must_use]
    pub fn extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    /// Use a specific tool cache.
    #[must_use]
    pub fn cache(mut self, cache: ToolCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use a specific scratch directory.
    #[must_use]
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Use a custom PATH registry.
    #[must_use]
    pub fn path_registry(mut self, registry: impl PathRegistry + 'static) -> Self {
        self.path = Some(Box::new(registry));
        self
    }

    /// Finish building.
    ///
    /// # Errors
    ///
    /// - `Error::Configuration` if the name is empty or not a single path
    ///   component, no resolver was set, or the bin subpath is absolute or leaves the tool directory
    /// - `Error::UnsupportedPlatform` if the platform cannot be detected
    /// - `Error::Environment` if the cache or temp directory is unusable
    pub fn build(self) -> Result<Provisioner> {
        if self.name.trim().is_empty() {
            return Err(Error::Configuration("tool name must not be empty".to_string()));
        }
        cache::check_component("tool name", &self.name)?;
        let resolver = self.resolver.ok_or_else(|| {
            Error::Configuration(format!(
                "no download URL resolver configured for '{}'",
                self.name
            ))
        })?;
        let bin_subpath = clean_subpath(&self.bin_subpath)?;

        let platform = match self.platform {
            Some(platform) => platform,
            None => platform::detect()?,
        };
        let cache = match self.cache {
            Some(cache) => cache,
            None => ToolCache::new(env::tool_cache_dir()?, platform.node_arch()),
        };
        let temp_dir = match self.temp_dir {
            Some(dir) => dir,
            None => env::temp_dir()?,
        };

        Ok(Provisioner {
            name: self.name,
            bin_subpath,
            auth_header: self.auth_header,
            platform,
            resolver,
            downloader: self
                .downloader
                .unwrap_or_else(|| Box::new(HttpDownloader::new())),
            extractor: self
                .extractor
                .unwrap_or_else(|| Box::new(ArchiveExtractor::new())),
            cache,
            temp_dir,
            path: self
                .path
                .unwrap_or_else(|| Box::new(ProcessPath::from_env())),
        })
    }
}

/// Drop `.` components and reject anything that could leave the tool root.
fn clean_subpath(subpath: &Path) -> Result<PathBuf> {
    let mut clean = PathBuf::new();
    for component in subpath.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => clean.push(part),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::Configuration(format!(
                    "bin subpath must be relative to the tool directory, got '{}'",
                    subpath.display()
                )));
            }
        }
    }
    Ok(clean)
}

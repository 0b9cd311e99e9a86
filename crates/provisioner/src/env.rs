//! Execution environment discovery.
//!
//! CI runners announce their scratch and tool-cache directories through
//! environment variables. Outside a runner, both fall back to a fixed
//! subpath of an OS-specific base directory.
//!
//! # Environment Variables
//!
//! - `RUNNER_TEMP` - scratch directory for downloads and extraction
//! - `RUNNER_TOOL_CACHE` - root of the tool cache
//!
//! # Fallback base
//!
//! - Windows: the home directory (`%USERPROFILE%`), else `C:\`
//! - macOS: `/Users`
//! - Linux and others: `/home`
//!
//! joined with `actions/temp` or `actions/cache`.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Environment variable naming the scratch directory.
pub const ENV_TEMP: &str = "RUNNER_TEMP";

/// Environment variable naming the tool cache root.
pub const ENV_TOOL_CACHE: &str = "RUNNER_TOOL_CACHE";

/// Resolve the current user's home directory.
///
/// Uses `USERPROFILE` on Windows and `HOME` elsewhere, falling back to the
/// platform lookup in [`dirs::home_dir`].
pub fn home_dir() -> Result<PathBuf> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    if let Some(home) = non_empty_var(var) {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir()
        .ok_or_else(|| Error::environment("could not determine home directory", None))
}

/// Base directory used when the runner variables are unset.
#[must_use]
pub fn base_dir() -> PathBuf {
    if cfg!(windows) {
        home_dir().unwrap_or_else(|_| PathBuf::from("C:\\"))
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/Users")
    } else {
        PathBuf::from("/home")
    }
}

/// Resolve the scratch directory for downloads and extraction.
///
/// Priority:
/// 1. `RUNNER_TEMP`
/// 2. `<base>/actions/temp`
pub fn temp_dir() -> Result<PathBuf> {
    resolve(ENV_TEMP, "temp")
}

/// Resolve the root of the tool cache.
///
/// Priority:
/// 1. `RUNNER_TOOL_CACHE`
/// 2. `<base>/actions/cache`
pub fn tool_cache_dir() -> Result<PathBuf> {
    resolve(ENV_TOOL_CACHE, "cache")
}

/// Create `dir` if needed, mapping failures to an environment error.
pub fn ensure_dir(dir: PathBuf) -> Result<PathBuf> {
    std::fs::create_dir_all(&dir).map_err(|e| {
        Error::environment(
            format!("cannot create directory {}: {}", dir.display(), e),
            Some(dir.clone()),
        )
    })?;
    Ok(dir)
}

fn resolve(var: &str, leaf: &str) -> Result<PathBuf> {
    if let Some(dir) = non_empty_var(var) {
        let path = PathBuf::from(dir);
        log::debug!("Using {} from {}: {}", leaf, var, path.display());
        return ensure_dir(path);
    }

    let path = base_dir().join("actions").join(leaf);
    log::debug!("{} not set, using default {} dir: {}", var, leaf, path.display());
    ensure_dir(path)
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

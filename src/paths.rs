//! Config file location for toolprov
//!
//! # Environment Variables
//!
//! - `TOOLPROV_CONFIG` - Path to the config file (e.g., `./toolprov.toml`)
//!
//! # Path Resolution Priority
//!
//! For config_file():
//! 1. `TOOLPROV_CONFIG` environment variable
//! 2. `toolprov.toml` in the current directory
//! 3. `XDG_CONFIG_HOME/toolprov/config.toml` (if set)
//! 4. Platform default:
//!    - Windows: `%APPDATA%\toolprov\config.toml`
//!    - macOS/Linux: `~/.config/toolprov/config.toml`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config file override
pub const ENV_CONFIG: &str = "TOOLPROV_CONFIG";

/// Project-local config file name
pub const LOCAL_CONFIG: &str = "toolprov.toml";

/// Get the toolprov config file path
pub fn config_file() -> Result<PathBuf> {
    if let Ok(file) = std::env::var(ENV_CONFIG)
        && !file.is_empty()
    {
        let path = expand_path(&file);
        log::debug!("Using config file from {}: {}", ENV_CONFIG, path.display());
        return Ok(path);
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    if local.is_file() {
        log::debug!("Using project config file: {}", local.display());
        return Ok(local);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("toolprov").join("config.toml");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("toolprov").join("config.toml");
            log::debug!("Using Windows config file: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("toolprov").join("config.toml");
    log::debug!("Using default config file: {}", path.display());
    Ok(path)
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| shellexpand::tilde(path).into_owned());
    PathBuf::from(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn with_env_var<F, R>(key: &str, value: Option<&str>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: test-only; these tests do not spawn threads that read the environment
        unsafe {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
        let result = f();
        // SAFETY: restoring the value saved above
        unsafe {
            match original {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
        result
    }

    #[test]
    fn test_config_file_env_override() {
        with_env_var(ENV_CONFIG, Some("/tmp/ci/toolprov.toml"), || {
            assert_eq!(
                config_file().unwrap(),
                PathBuf::from("/tmp/ci/toolprov.toml")
            );
        });
    }

    #[test]
    fn test_config_file_default_name() {
        with_env_var(ENV_CONFIG, None, || {
            let path = config_file().unwrap();
            assert!(
                path.ends_with(LOCAL_CONFIG) || path.ends_with("toolprov/config.toml"),
                "unexpected config path {}",
                path.display()
            );
        });
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/tools.toml");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("tools.toml"));
    }

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("/etc/toolprov.toml"), PathBuf::from("/etc/toolprov.toml"));
    }
}

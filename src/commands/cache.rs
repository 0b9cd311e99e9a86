//! `toolprov find` and `toolprov list`: read-only tool cache queries.

use crate::Context;
use crate::ui;
use anyhow::{Context as _, Result, bail};
use provisioner::cache::ToolCache;
use provisioner::{env, normalize, platform};
use std::path::PathBuf;

/// The tool cache for this machine's architecture.
fn open_cache() -> Result<ToolCache> {
    let platform = platform::detect()?;
    let root = env::tool_cache_dir().context("Could not locate the tool cache")?;
    Ok(ToolCache::new(root, platform.node_arch()))
}

pub fn find(ctx: &Context, name: &str, version: &str) -> Result<()> {
    let path = find_in(&open_cache()?, name, version)?;
    if ctx.quiet {
        println!("{}", path.display());
    } else {
        ui::success(&format!("{} {} is cached", name, normalize(version)));
        ui::kv("Path", &path.display().to_string());
    }
    Ok(())
}

pub fn list(ctx: &Context, name: &str) -> Result<()> {
    let cache = open_cache()?;
    let versions = cache.find_all_versions(name)?;

    if versions.is_empty() {
        if !ctx.quiet {
            ui::info(&format!("No cached versions of {} in {}", name, cache.root().display()));
        }
        return Ok(());
    }

    if !ctx.quiet {
        ui::header(&format!("{} ({})", name, cache.arch()));
    }
    for version in versions {
        println!("{}", version);
    }
    Ok(())
}

fn find_in(cache: &ToolCache, name: &str, version: &str) -> Result<PathBuf> {
    let normalized = normalize(version);
    match cache.find(name, &normalized) {
        Some(path) => Ok(path),
        None => bail!("{} {} is not in the tool cache", name, normalized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_in_normalizes_version() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ToolCache::new(tmp.path().join("cache"), "x64");
        let tool = tmp.path().join("extracted");
        fs::create_dir_all(&tool).unwrap();
        fs::write(tool.join("demo"), b"#!/bin/sh\n").unwrap();
        let cached = cache.cache_dir(&tool, "demo", "1.4.0").unwrap();

        assert_eq!(find_in(&cache, "demo", "1.4").unwrap(), cached);
        assert_eq!(find_in(&cache, "demo", "1.4.0").unwrap(), cached);
    }

    #[test]
    fn test_find_in_miss_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ToolCache::new(tmp.path(), "x64");
        let err = find_in(&cache, "demo", "2").unwrap_err();
        assert_eq!(err.to_string(), "demo 2.0.0 is not in the tool cache");
    }
}

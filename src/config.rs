//! Declarative tool list (`toolprov.toml`)
//!
//! ```toml
//! [tools.node]
//! version = "20.11"
//! url = "https://nodejs.org/dist/v{normalized}/node-v{normalized}-{node_os}-{node_arch}.{ext}"
//! bin = "node-v20.11.0-linux-x64/bin"
//!
//! [tools.ripgrep]
//! version = "14.1.0"
//! github = "BurntSushi/ripgrep"
//! asset = "ripgrep-{normalized}-{triple}.tar.gz"
//! tag_prefix = ""
//! ```

use crate::paths;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Tools keyed by name, applied in name order
    #[serde(default)]
    pub tools: BTreeMap<String, ToolEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolEntry {
    pub version: String,

    /// Download URL template
    #[serde(default)]
    pub url: Option<String>,

    /// GitHub repository (owner/repo) publishing the release asset
    #[serde(default)]
    pub github: Option<String>,

    /// Release asset name template
    #[serde(default)]
    pub asset: Option<String>,

    /// Directory inside the extracted archive to add to PATH
    #[serde(default)]
    pub bin: Option<String>,

    #[serde(default)]
    pub tag_prefix: Option<String>,

    /// Name of an environment variable holding the Authorization header
    #[serde(default)]
    pub auth_header_env: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Where a tool's download URL comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source<'a> {
    Url(&'a str),
    GitHub { repo: &'a str, asset: &'a str },
}

impl Config {
    /// Load the config file, or an empty config if it does not exist
    pub fn load() -> Result<Self> {
        let path = paths::config_file()?;
        if !path.exists() {
            log::debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML format in toolprov config")
    }

    /// Validate every tool entry
    pub fn validate(&self) -> Result<()> {
        for (name, tool) in &self.tools {
            tool.validate()
                .with_context(|| format!("Invalid tool '{}'", name))?;
        }
        Ok(())
    }

    /// Enabled tools, in name order
    pub fn enabled_tools(&self) -> impl Iterator<Item = (&String, &ToolEntry)> {
        self.tools.iter().filter(|(_, tool)| tool.enabled)
    }
}

impl ToolEntry {
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            bail!("version cannot be empty");
        }
        self.source()?;
        if self.asset.is_some() && self.github.is_none() {
            bail!("'asset' is only used together with 'github'");
        }
        if self.tag_prefix.is_some() && self.github.is_none() {
            bail!("'tag_prefix' is only used together with 'github'");
        }
        Ok(())
    }

    /// The URL source, requiring exactly one of `url` or `github`
    pub fn source(&self) -> Result<Source<'_>> {
        match (&self.url, &self.github) {
            (Some(url), None) => Ok(Source::Url(url)),
            (None, Some(repo)) => match &self.asset {
                Some(asset) => Ok(Source::GitHub { repo, asset }),
                None => bail!("'github' requires an 'asset' template"),
            },
            (Some(_), Some(_)) => bail!("set either 'url' or 'github', not both"),
            (None, None) => bail!("one of 'url' or 'github' is required"),
        }
    }

    /// Authorization header from the named environment variable, if any
    pub fn auth_header(&self) -> Result<Option<String>> {
        let Some(var) = &self.auth_header_env else {
            return Ok(None);
        };
        match std::env::var(var) {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            _ => bail!("environment variable {} (auth_header_env) is not set", var),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[tools.node]
version = "20.11"
url = "https://nodejs.org/dist/v{normalized}/node-v{normalized}-{node_os}-{node_arch}.{ext}"
bin = "node-v20.11.0-linux-x64/bin"

[tools.ripgrep]
version = "14.1.0"
github = "BurntSushi/ripgrep"
asset = "ripgrep-{normalized}-{triple}.tar.gz"
tag_prefix = ""

[tools.old]
version = "1"
url = "https://example.com/old-{version}.zip"
enabled = false
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE).unwrap();
        config.validate().unwrap();

        let node = &config.tools["node"];
        assert_eq!(node.version, "20.11");
        assert!(matches!(node.source().unwrap(), Source::Url(u) if u.starts_with("https://nodejs.org")));
        assert_eq!(node.bin.as_deref(), Some("node-v20.11.0-linux-x64/bin"));
        assert!(node.enabled);

        let rg = &config.tools["ripgrep"];
        assert_eq!(
            rg.source().unwrap(),
            Source::GitHub {
                repo: "BurntSushi/ripgrep",
                asset: "ripgrep-{normalized}-{triple}.tar.gz"
            }
        );
        assert_eq!(rg.tag_prefix.as_deref(), Some(""));
    }

    #[test]
    fn test_enabled_tools_skips_disabled_in_name_order() {
        let config = Config::parse(SAMPLE).unwrap();
        let names: Vec<_> = config.enabled_tools().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["node", "ripgrep"]);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::parse("").unwrap();
        assert!(config.tools.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_both_sources() {
        let config = Config::parse(
            r#"
[tools.x]
version = "1"
url = "https://example.com/x.zip"
github = "o/r"
asset = "x.zip"
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("not both"));
    }

    #[test]
    fn test_validate_rejects_missing_source() {
        let config = Config::parse("[tools.x]\nversion = \"1\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("Invalid tool 'x'"));
    }

    #[test]
    fn test_validate_rejects_github_without_asset() {
        let config = Config::parse("[tools.x]\nversion = \"1\"\ngithub = \"o/r\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_version() {
        let config =
            Config::parse("[tools.x]\nversion = \" \"\nurl = \"https://e.com/x.zip\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Config::parse("[tools.x]\nversion = \"1\"\nurl = \"u\"\nsha = \"abc\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("toolprov.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tools.len(), 3);
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/toolprov.toml")).unwrap_err();
        assert!(err.to_string().contains("Could not read config file"));
    }

    #[test]
    fn test_auth_header_unset_is_none() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.tools["node"].auth_header().unwrap(), None);
    }

    #[test]
    fn test_auth_header_missing_variable_is_error() {
        let entry = ToolEntry {
            version: "1".to_string(),
            url: Some("https://example.com/x.zip".to_string()),
            github: None,
            asset: None,
            bin: None,
            tag_prefix: None,
            auth_header_env: Some("TOOLPROV_TEST_SURELY_UNSET_HEADER".to_string()),
            enabled: true,
        };
        assert!(entry.auth_header().is_err());
    }
}

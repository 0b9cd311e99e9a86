//! Download URL resolution.
//!
//! Each tool supplies a [`UrlResolver`] that turns a requested version into
//! a download URL. Resolvers are injected into the
//! [`Provisioner`](crate::Provisioner); there is no default, and a missing
//! resolver is reported as a configuration error when the provisioner is
//! built.
//!
//! Three resolvers are provided:
//!
//! - [`TemplateResolver`] fills placeholders in a URL template
//! - [`GitHubReleaseResolver`] looks up a release asset through the GitHub API
//! - any `Fn(&str, &Platform) -> Result<String>` closure
//!
//! # Template placeholders
//!
//! | Placeholder    | Example (Linux x86_64, version "20.11") |
//! |----------------|------------------------------------------|
//! | `{version}`    | `20.11`                                  |
//! | `{normalized}` | `20.11.0`                                |
//! | `{os}`         | `linux`                                  |
//! | `{arch}`       | `x86_64`                                 |
//! | `{triple}`     | `x86_64-unknown-linux-gnu`               |
//! | `{node_os}`    | `linux`                                  |
//! | `{node_arch}`  | `x64`                                    |
//! | `{ext}`        | `tar.gz`                                 |
//! | `{exe}`        | (empty)                                  |
//! | `{tag}`        | `v20.11` (GitHub asset templates only)   |

use crate::error::{Error, Result};
use crate::types::{Platform, Release, ReleaseAsset};
use crate::version::normalize;
use serde::Deserialize;

/// Placeholders understood by every template.
const TEMPLATE_VARS: [&str; 9] = [
    "version",
    "normalized",
    "os",
    "arch",
    "triple",
    "node_os",
    "node_arch",
    "ext",
    "exe",
];

/// Turns a requested version into a download URL.
pub trait UrlResolver: Send + Sync {
    /// Resolve the download URL for `version` on `platform`.
    fn resolve_download_url(&self, version: &str, platform: &Platform) -> Result<String>;
}

impl<F> UrlResolver for F
where
    F: Fn(&str, &Platform) -> Result<String> + Send + Sync,
{
    fn resolve_download_url(&self, version: &str, platform: &Platform) -> Result<String> {
        self(version, platform)
    }
}

/// Resolver that fills placeholders in a URL template.
///
/// # Example
///
/// ```
/// use provisioner::resolver::{TemplateResolver, UrlResolver};
/// use provisioner::Platform;
///
/// let resolver = TemplateResolver::new(
///     "https://nodejs.org/dist/v{normalized}/node-v{normalized}-{node_os}-{node_arch}.{ext}",
/// )
/// .unwrap();
/// let platform = Platform::new("linux", "x86_64", "x86_64-unknown-linux-gnu");
/// assert_eq!(
///     resolver.resolve_download_url("20.11", &platform).unwrap(),
///     "https://nodejs.org/dist/v20.11.0/node-v20.11.0-linux-x64.tar.gz"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    template: String,
}

impl TemplateResolver {
    /// Create a resolver, validating the template.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for empty templates, unknown
    /// placeholders, or unbalanced braces.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(Error::Configuration("URL template is empty".to_string()));
        }
        validate_template(&template, &TEMPLATE_VARS)?;
        Ok(Self { template })
    }

    /// The raw template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl UrlResolver for TemplateResolver {
    fn resolve_download_url(&self, version: &str, platform: &Platform) -> Result<String> {
        render(&self.template, |name| template_var(name, version, platform))
    }
}

/// Resolver that picks an asset from a GitHub release.
///
/// The release tag is `tag_prefix + version` (prefix defaults to `v`) and
/// the asset name is rendered from a template, which additionally accepts
/// `{tag}`. A token, when given, is sent as a bearer token to the releases
/// API for higher rate limits.
///
/// # Example
///
/// ```no_run
/// use provisioner::resolver::{GitHubReleaseResolver, UrlResolver};
/// use provisioner::platform;
///
/// let resolver = GitHubReleaseResolver::new(
///     "helm/helm",
///     "helm-{tag}-{node_os}-{node_arch}.tar.gz",
/// )
/// .unwrap();
/// let url = resolver
///     .resolve_download_url("3.14.0", &platform::detect().unwrap())
///     .unwrap();
/// println!("{url}");
/// ```
pub struct GitHubReleaseResolver {
    agent: ureq::Agent,
    api_base: String,
    repo: String,
    asset_template: String,
    tag_prefix: String,
    token: Option<String>,
}

impl GitHubReleaseResolver {
    /// Create a resolver for `owner/repo` with an asset name template.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `repo` is not `owner/repo` or the
    /// asset template is invalid.
    pub fn new(repo: impl Into<String>, asset_template: impl Into<String>) -> Result<Self> {
        let repo = repo.into();
        let asset_template = asset_template.into();

        let valid_repo = matches!(
            repo.split_once('/'),
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/')
        );
        if !valid_repo {
            return Err(Error::Configuration(format!(
                "GitHub repository must be 'owner/repo', got '{repo}'"
            )));
        }
        if asset_template.trim().is_empty() {
            return Err(Error::Configuration("asset template is empty".to_string()));
        }
        let mut vars = TEMPLATE_VARS.to_vec();
        vars.push("tag");
        validate_template(&asset_template, &vars)?;

        Ok(Self {
            agent: ureq::Agent::new_with_defaults(),
            api_base: "https://api.github.com".to_string(),
            repo,
            asset_template,
            tag_prefix: "v".to_string(),
            token: None,
        })
    }

    /// Set the prefix prepended to the version to form the tag.
    #[must_use]
    pub fn tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = prefix.into();
        self
    }

    /// Authenticate API requests with a token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Use a different API base (GitHub Enterprise or tests).
    #[must_use]
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Tag for a requested version.
    #[must_use]
    pub fn tag_for(&self, version: &str) -> String {
        format!("{}{}", self.tag_prefix, version)
    }

    /// API URL for a release tag.
    fn release_url(&self, tag: &str) -> String {
        format!("{}/repos/{}/releases/tags/{}", self.api_base, self.repo, tag)
    }

    /// Render the asset name for a version.
    fn asset_name(&self, version: &str, platform: &Platform) -> Result<String> {
        let tag = self.tag_for(version);
        render(&self.asset_template, |name| {
            if name == "tag" {
                Some(tag.clone())
            } else {
                template_var(name, version, platform)
            }
        })
    }

    fn fetch_release(&self, tag: &str) -> Result<Release> {
        let url = self.release_url(tag);
        log::debug!("Fetching release {} from {}", tag, url);

        let mut request = self
            .agent
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("provisioner/", env!("CARGO_PKG_VERSION")));
        if let Some(token) = &self.token {
            request = request.header("Authorization", &format!("Bearer {token}"));
        }

        let response: GitHubRelease = request.call()?.body_mut().read_json()?;
        Ok(response.into())
    }

    /// Pick the asset named by the template from a release.
    fn select_asset<'a>(
        &self,
        release: &'a Release,
        version: &str,
        platform: &Platform,
    ) -> Result<&'a ReleaseAsset> {
        let name = self.asset_name(version, platform)?;
        release
            .find_asset(&name)
            .ok_or_else(|| Error::AssetNotFound {
                tag: release.tag.clone(),
                pattern: name,
            })
    }
}

impl UrlResolver for GitHubReleaseResolver {
    fn resolve_download_url(&self, version: &str, platform: &Platform) -> Result<String> {
        let release = self.fetch_release(&self.tag_for(version))?;
        let asset = self.select_asset(&release, version, platform)?;
        Ok(asset.download_url.clone())
    }
}

fn template_var(name: &str, version: &str, platform: &Platform) -> Option<String> {
    let value = match name {
        "version" => version.to_string(),
        "normalized" => normalize(version),
        "os" => platform.os.clone(),
        "arch" => platform.arch.clone(),
        "triple" => platform.triple.clone(),
        "node_os" => platform.node_os().to_string(),
        "node_arch" => platform.node_arch().to_string(),
        "ext" => platform.archive_ext().to_string(),
        "exe" => platform.exe_suffix().to_string(),
        _ => return None,
    };
    Some(value)
}

/// Check that every placeholder in `template` is one of `allowed`.
fn validate_template(template: &str, allowed: &[&str]) -> Result<()> {
    render(template, |name| allowed.contains(&name).then(String::new)).map(|_| ())
}

/// Replace `{name}` placeholders using `lookup`.
fn render(template: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(['{', '}']) {
        if rest[open..].starts_with('}') {
            return Err(Error::Configuration(format!(
                "unbalanced '}}' in template '{template}'"
            )));
        }
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            Error::Configuration(format!("unterminated placeholder in template '{template}'"))
        })?;
        let name = &after[..close];
        let value = lookup(name).ok_or_else(|| {
            Error::Configuration(format!("unknown placeholder {{{name}}} in template '{template}'"))
        })?;
        out.push_str(&value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

// =============================================================================
// GitHub API response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    assets: Vec<GitHubAsset>,
}

#[derive(Debug, Deserialize)]
struct GitHubAsset {
    name: String,
    browser_download_url: String,
}

impl From<GitHubRelease> for Release {
    fn from(r: GitHubRelease) -> Self {
        Self {
            tag: r.tag_name,
            assets: r.assets.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<GitHubAsset> for ReleaseAsset {
    fn from(a: GitHubAsset) -> Self {
        Self {
            name: a.name,
            download_url: a.browser_download_url,
        }
    }
}

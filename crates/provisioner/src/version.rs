//! Version normalization for cache keys.
//!
//! Tool versions arrive as whatever the user typed (`"18"`, `"3.11"`,
//! `"1.2.3"`). The cache is keyed by a three-component version, so short
//! versions are right-padded with `0` components. Components are not
//! validated: `"1.x"` becomes `"1.x.0"`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pad a version string to at least three dot-separated components.
///
/// Only the number of components is inspected. Versions that already have
/// three or more components are returned unchanged.
///
/// # Example
///
/// ```
/// use provisioner::version::normalize;
///
/// assert_eq!(normalize("1"), "1.0.0");
/// assert_eq!(normalize("1.2"), "1.2.0");
/// assert_eq!(normalize("1.2.3"), "1.2.3");
/// assert_eq!(normalize("1.2.3.4"), "1.2.3.4");
/// ```
#[must_use]
pub fn normalize(version: &str) -> String {
    match version.split('.').count() {
        1 => format!("{version}.0.0"),
        2 => format!("{version}.0"),
        _ => version.to_string(),
    }
}

/// A version that has been passed through [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedVersion(String);

impl NormalizedVersion {
    /// Normalize a raw version string.
    #[must_use]
    pub fn new(version: &str) -> Self {
        Self(normalize(version))
    }

    /// The normalized version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NormalizedVersion {
    fn from(version: &str) -> Self {
        Self::new(version)
    }
}

impl AsRef<str> for NormalizedVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

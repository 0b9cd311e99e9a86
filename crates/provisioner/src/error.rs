//! Error types for provisioning operations.
//!
//! Every failure surfaces to the caller as one of three kinds: a
//! configuration problem (no URL resolver, bad template), an acquisition
//! failure (download, extraction or cache registration, carrying the
//! requested version), or an environment problem (temp or cache directory
//! unresolvable). Nothing is retried here; [`Error::is_retryable`] lets the
//! caller decide.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of provisioning errors.
///
/// Categories drive the caller's retry policy and the hint shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid configuration (not retryable).
    Configuration,
    /// Network-related errors (transient, retryable).
    Network,
    /// Archive or response format error.
    Format,
    /// Permission denied on the filesystem.
    Permission,
    /// Temp, cache or home directory could not be resolved.
    Environment,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Invalid configuration",
            Self::Network => "Network connectivity issue",
            Self::Format => "Invalid file format",
            Self::Permission => "Permission denied",
            Self::Environment => "Execution environment not usable",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => "Check the tool's URL template or resolver settings",
            Self::Network => "Check your internet connection and try again",
            Self::Format => "The downloaded file may be corrupted or not an archive, try again",
            Self::Permission => "Check directory permissions or run with appropriate access",
            Self::Environment => "Set RUNNER_TEMP and RUNNER_TOOL_CACHE to writable directories",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Pipeline stage an acquisition failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Turning the version into a download URL.
    Resolve,
    /// Fetching the archive.
    Download,
    /// Unpacking the archive.
    Extract,
    /// Registering the extracted directory in the tool cache.
    Cache,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Resolve => "resolve",
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Cache => "cache",
        };
        write!(f, "{s}")
    }
}

/// Errors that can occur while provisioning a tool.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid configuration. Reported before any I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stage of acquiring a version failed.
    #[error("failed to {stage} {tool} version {version}: {source}")]
    Acquisition {
        /// Tool name.
        tool: String,
        /// Version as requested by the caller.
        version: String,
        /// Stage that failed.
        stage: Stage,
        /// Underlying cause.
        #[source]
        source: Box<Error>,
    },

    /// Temp, cache or home directory could not be resolved or created.
    #[error("environment error: {message}")]
    Environment {
        /// What could not be resolved.
        message: String,
        /// Path involved, if one was resolved.
        path: Option<PathBuf>,
    },

    /// Failed to detect the current platform.
    #[error("unsupported platform: {os}/{arch}")]
    UnsupportedPlatform {
        /// Operating system.
        os: String,
        /// CPU architecture.
        arch: String,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Archive could not be unpacked.
    #[error("extraction of {archive} failed: {message}")]
    Extraction {
        /// Archive being extracted.
        archive: PathBuf,
        /// Error message.
        message: String,
    },

    /// IO error during file operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// No release asset matched the requested platform.
    #[error("no asset matching {pattern} in release {tag}")]
    AssetNotFound {
        /// Release tag searched.
        tag: String,
        /// Asset name that was expected.
        pattern: String,
    },

    /// Invalid response from a release API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Create an environment error.
    pub fn environment(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Environment {
            message: message.into(),
            path,
        }
    }

    /// Create an extraction error.
    pub fn extraction(archive: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Extraction {
            archive: archive.into(),
            message: message.to_string(),
        }
    }

    /// Wrap a primitive failure as an acquisition failure.
    pub fn acquisition(
        tool: impl Into<String>,
        version: impl Into<String>,
        stage: Stage,
        source: Error,
    ) -> Self {
        Self::Acquisition {
            tool: tool.into(),
            version: version.into(),
            stage,
            source: Box::new(source),
        }
    }

    /// Get the error category for retry logic.
    ///
    /// Acquisition failures report the category of their cause, so a
    /// network blip during download is retryable while a corrupt archive
    /// is not.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Configuration(_) => ErrorCategory::Configuration,
            Error::Acquisition { source, .. } => source.category(),
            Error::Environment { .. } => ErrorCategory::Environment,
            Error::UnsupportedPlatform { .. } => ErrorCategory::Configuration,
            Error::Http { status, .. } => match status {
                Some(401 | 403 | 404) => ErrorCategory::Configuration,
                _ => ErrorCategory::Network,
            },
            Error::Extraction { .. } => ErrorCategory::Format,
            Error::Io { source, .. } => {
                if source.kind() == io::ErrorKind::PermissionDenied {
                    ErrorCategory::Permission
                } else {
                    ErrorCategory::Other
                }
            }
            Error::AssetNotFound { .. } => ErrorCategory::Configuration,
            Error::InvalidResponse(_) => ErrorCategory::Format,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// The requested version, for acquisition failures.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            Error::Acquisition { version, .. } => Some(version),
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {}", code),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

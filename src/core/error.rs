//! Error handling for plexup
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`PlexupError`]) so each failure mode in the
//!    update pipeline can be matched on precisely
//! 2. **User-friendly presentation** ([`ErrorContext`]) so CLI users see a
//!    diagnostic plus an actionable suggestion instead of a bare Rust error
//!
//! # Error Categories
//!
//! Variants map one-to-one onto the stages of an update run:
//! - **Configuration**: [`PlexupError::ConfigNotFound`],
//!   [`PlexupError::ConfigIo`], [`PlexupError::ConfigParse`]
//! - **Release feed**: [`PlexupError::FeedNetwork`],
//!   [`PlexupError::FeedHttp`], [`PlexupError::FeedParse`]
//! - **Version probe**: [`PlexupError::ProbeUnsupported`],
//!   [`PlexupError::ProbeNoMatch`], [`PlexupError::ExecutionFailed`]
//! - **Artifact download**: [`PlexupError::DownloadNetwork`],
//!   [`PlexupError::DownloadHttp`], [`PlexupError::DownloadIo`]
//! - **Verification**: [`PlexupError::ChecksumMismatch`]
//! - **Run coordination**: [`PlexupError::AlreadyRunning`]
//!
//! Configuration, feed, and probe failures are fatal before anything is
//! downloaded; download and verification failures are fatal before anything
//! is installed. Use [`user_friendly_error`] at the CLI boundary to convert
//! any error into a displayable context.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for plexup operations.
///
/// Each variant carries the context needed to render a self-contained
/// diagnostic: paths, URLs, HTTP statuses, and the reason reported by the
/// underlying library or tool.
#[derive(Error, Debug)]
pub enum PlexupError {
    /// Configuration file does not exist at the resolved path
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was checked for the configuration file
        path: String,
    },

    /// Configuration file exists but could not be read
    #[error("Failed to read configuration file {path}: {reason}")]
    ConfigIo {
        /// Path to the unreadable configuration file
        path: String,
        /// Reason reported by the operating system
        reason: String,
    },

    /// Configuration file is malformed or missing a required field
    ///
    /// Raised at load time, before any network or subprocess activity, so a
    /// bad config never produces a partial run.
    #[error("Invalid configuration in {path}: {reason}")]
    ConfigParse {
        /// Path to the configuration file that failed validation
        path: String,
        /// What was malformed or missing
        reason: String,
    },

    /// HTTP client could not be constructed
    #[error("Failed to construct HTTP client: {reason}")]
    HttpClient {
        /// Reason reported by the HTTP library
        reason: String,
    },

    /// Connection or timeout failure while fetching the release feed
    #[error("Network error while fetching release feed from {url}: {reason}")]
    FeedNetwork {
        /// Feed URL that could not be reached
        url: String,
        /// Underlying transport error
        reason: String,
    },

    /// Release feed responded with a non-success HTTP status
    #[error("Release feed request to {url} returned HTTP {status}")]
    FeedHttp {
        /// Feed URL that was requested
        url: String,
        /// HTTP status code of the response
        status: u16,
    },

    /// Release feed document is malformed or missing the expected keys
    #[error("Malformed release feed: {reason}")]
    FeedParse {
        /// What the document was missing or why parsing failed
        reason: String,
    },

    /// The configured OS/packaging combination is not supported
    ///
    /// Only `os: Linux` with `packaging: debian` has an implemented probe and
    /// install path.
    #[error("Unsupported platform {os}/{packaging}: only Linux/debian is supported")]
    ProbeUnsupported {
        /// Configured operating system name
        os: String,
        /// Configured packaging format
        packaging: String,
    },

    /// dpkg output did not contain a recognizable version string
    ///
    /// This is the authoritative probe failure signal; a non-zero dpkg exit
    /// code alone is not treated as fatal.
    #[error("No version string found in dpkg output for package '{package}'")]
    ProbeNoMatch {
        /// Package that was queried
        package: String,
    },

    /// An external command could not be invoked at all
    #[error("Failed to invoke '{command}': {reason}")]
    ExecutionFailed {
        /// The command that could not be started
        command: String,
        /// Reason reported by the operating system
        reason: String,
    },

    /// The feed lists no release for the local platform/packaging tuple
    ///
    /// Detected before any download is attempted; an empty candidate list is
    /// a valid feed state, but an update cannot proceed from it.
    #[error("No release candidate matches build '{build}' with packaging '{distro}'")]
    NoCandidate {
        /// Build tag the candidates were filtered by
        build: String,
        /// Packaging/distro tag the candidates were filtered by
        distro: String,
    },

    /// Connection or stream failure while downloading the artifact
    #[error("Network error while downloading {url}: {reason}")]
    DownloadNetwork {
        /// Artifact URL that failed
        url: String,
        /// Underlying transport error
        reason: String,
    },

    /// Artifact download responded with a non-success HTTP status
    ///
    /// Raised eagerly, before any byte is written to the destination path.
    #[error("Download of {url} failed with HTTP {status}")]
    DownloadHttp {
        /// Artifact URL that was requested
        url: String,
        /// HTTP status code of the response
        status: u16,
    },

    /// Local write failure while streaming the artifact to disk
    #[error("Failed to write artifact to {path}: {reason}")]
    DownloadIo {
        /// Destination path that could not be written
        path: String,
        /// Reason reported by the operating system
        reason: String,
    },

    /// Computed artifact digest does not match the feed's expected checksum
    ///
    /// The artifact is discarded and the run aborts without installing.
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Path to the artifact that failed verification
        path: String,
        /// Checksum advertised by the feed
        expected: String,
        /// Checksum computed from the downloaded bytes
        actual: String,
    },

    /// Another plexup run holds the advisory lock
    #[error("Another plexup run appears to be in progress (lock file {path} is held)")]
    AlreadyRunning {
        /// Path to the held lock file
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wrapper that pairs an error with user-facing context.
///
/// Rendered at the CLI boundary with color coding: the error itself in red,
/// optional details in yellow, and an actionable suggestion in green.
pub struct ErrorContext {
    /// The underlying error
    pub error: anyhow::Error,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: error.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl fmt::Debug for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Convert any error into an [`ErrorContext`] with contextual suggestions.
///
/// Known [`PlexupError`] variants get a suggestion and details tuned to the
/// pipeline stage that failed; everything else passes through undecorated.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let (suggestion, details): (Option<&str>, Option<&str>) = match error
        .downcast_ref::<PlexupError>()
    {
        Some(PlexupError::ConfigNotFound { .. }) => (
            Some("Create /etc/plexup/config.yml or point at one with --config"),
            Some("plexup needs a YAML config declaring source, os, arch, and packaging"),
        ),
        Some(PlexupError::ConfigIo { .. }) => (
            Some("Check the file permissions on the configuration file"),
            None,
        ),
        Some(PlexupError::ConfigParse { .. }) => (
            Some("Check the YAML syntax and make sure source, os, arch, and packaging are all present and non-empty"),
            None,
        ),
        Some(PlexupError::FeedNetwork { .. } | PlexupError::FeedHttp { .. }) => (
            Some("Check connectivity to the release feed and that 'source' points at the right URL"),
            Some("The feed request is bounded by a 10 second timeout"),
        ),
        Some(PlexupError::FeedParse { .. }) => (
            Some("Verify that the 'category' and 'os' settings match the keys in the feed document"),
            None,
        ),
        Some(PlexupError::ProbeUnsupported { .. }) => (
            Some("Set os: Linux and packaging: debian; no other combination is implemented"),
            None,
        ),
        Some(PlexupError::ProbeNoMatch { .. }) => (
            Some("Is the package installed? Run `dpkg -s <package>` manually to inspect the output"),
            Some("The probe looks for a 'Version: <a>.<b>.<c>.<d>-<tag>' line in the dpkg output"),
        ),
        Some(PlexupError::ExecutionFailed { .. }) => (
            Some("Make sure dpkg and systemctl are installed and on PATH"),
            None,
        ),
        Some(PlexupError::NoCandidate { .. }) => (
            Some("The feed lists no release for this platform; check the 'arch' and 'packaging' settings"),
            None,
        ),
        Some(
            PlexupError::DownloadNetwork { .. }
            | PlexupError::DownloadHttp { .. }
            | PlexupError::DownloadIo { .. },
        ) => (
            Some("Re-run the update; partial downloads are overwritten on retry"),
            None,
        ),
        Some(PlexupError::ChecksumMismatch { .. }) => (
            Some("The artifact was discarded; re-run the update. If this persists the feed may be serving a corrupt package"),
            Some("Nothing was installed: an unverified artifact never reaches the install sequence"),
        ),
        Some(PlexupError::AlreadyRunning { .. }) => (
            Some("Wait for the other run to finish, or remove the lock file if it is stale"),
            None,
        ),
        _ => (None, None),
    };

    ErrorContext {
        error,
        suggestion: suggestion.map(String::from),
        details: details.map(String::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_mismatch_message_names_both_digests() {
        let err = PlexupError::ChecksumMismatch {
            path: "/tmp/plex-1.2.3.4-abc.deb".to_string(),
            expected: "deadbeef".to_string(),
            actual: "cafebabe".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("deadbeef"));
        assert!(message.contains("cafebabe"));
    }

    #[test]
    fn user_friendly_error_attaches_suggestion_for_known_variants() {
        let err = PlexupError::ConfigNotFound {
            path: "/etc/plexup/config.yml".to_string(),
        };
        let ctx = user_friendly_error(anyhow::Error::from(err));
        assert!(ctx.suggestion.is_some());
        assert!(ctx.to_string().contains("Configuration file not found"));
    }

    #[test]
    fn user_friendly_error_passes_unknown_errors_through() {
        let ctx = user_friendly_error(anyhow::anyhow!("something else entirely"));
        assert!(ctx.suggestion.is_none());
        assert!(ctx.details.is_none());
    }

    #[test]
    fn error_context_display_includes_suggestion() {
        let ctx = ErrorContext::new(PlexupError::AlreadyRunning {
            path: "/tmp/plexup.lock".to_string(),
        })
        .with_suggestion("wait for the other run");
        let rendered = format!("{ctx}");
        assert!(rendered.contains("plexup.lock"));
        assert!(rendered.contains("Suggestion: wait for the other run"));
    }
}

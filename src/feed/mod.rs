//! Release feed client
//!
//! Fetches the remote release-metadata document and reduces it to the
//! information one run needs: the latest advertised version and the ordered
//! list of release candidates matching the local platform tuple.
//!
//! # Document Shape
//!
//! The feed is a JSON document keyed by category, then OS name:
//!
//! ```json
//! {
//!   "computer": {
//!     "Linux": {
//!       "version": "1.40.1.5678-def",
//!       "releases": [
//!         {
//!           "build": "linux-x86_64",
//!           "distro": "debian",
//!           "url": "https://plex.example/pms.deb",
//!           "checksum": "0a0a9f2a6772942557ab5355d76af442f8f65e01"
//!         }
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! Candidates are filtered to entries whose `build` equals
//! `{os-lowercased}-{arch}` and whose `distro` equals the configured
//! packaging format, preserving feed order. Zero matches is a valid result -
//! the orchestrator decides whether that aborts the run.
//!
//! The document is small, so it is buffered in full (bounded by a 10 second
//! request timeout) and a copy is kept in the scratch directory for operator
//! inspection.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::UpdaterConfig;
use crate::core::PlexupError;

/// Total bound on the feed request.
pub const FEED_TIMEOUT: Duration = Duration::from_secs(10);

/// A single release entry from the feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Build tag, `{os}-{arch}` (e.g. `linux-x86_64`).
    pub build: String,
    /// Distro/packaging tag (e.g. `debian`).
    pub distro: String,
    /// Download URL for the installable artifact.
    pub url: String,
    /// Expected SHA-1 digest of the artifact, hex-encoded.
    pub checksum: String,
}

/// Per-OS entry in the feed document.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformReleases {
    /// Latest version advertised for this OS.
    pub version: String,
    /// All releases for this OS, in feed order.
    #[serde(default)]
    pub releases: Vec<Release>,
}

/// The full feed document: category name -> OS name -> releases.
pub type FeedDocument = HashMap<String, HashMap<String, PlatformReleases>>;

/// What one run needs from the feed: the advertised latest version and the
/// candidates that match the local platform tuple, in feed order.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    /// Latest version string advertised for the configured OS.
    pub latest_version: String,
    /// Releases matching the local (build, distro) filter.
    pub candidates: Vec<Release>,
}

/// HTTP client for the release feed.
pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    /// Create a feed client with the bounded request timeout.
    ///
    /// # Errors
    ///
    /// [`PlexupError::HttpClient`] when the underlying client cannot be
    /// constructed.
    pub fn new() -> Result<Self, PlexupError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("plexup/", env!("CARGO_PKG_VERSION")))
            .timeout(FEED_TIMEOUT)
            .build()
            .map_err(|e| PlexupError::HttpClient {
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Fetch the feed and reduce it to a [`FeedSnapshot`] for this host.
    ///
    /// A copy of the raw document is written to
    /// [`UpdaterConfig::feed_cache_path`].
    ///
    /// # Errors
    ///
    /// - [`PlexupError::FeedNetwork`] on connection or timeout failures
    /// - [`PlexupError::FeedHttp`] on a non-success response status
    /// - [`PlexupError::FeedParse`] when the document is malformed or does
    ///   not contain the configured category/OS keys
    pub async fn fetch_latest(&self, config: &UpdaterConfig) -> Result<FeedSnapshot, PlexupError> {
        let url = config.source.as_str();
        tracing::debug!(target: "feed", "Fetching release feed from {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            PlexupError::FeedNetwork {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlexupError::FeedHttp {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| PlexupError::FeedNetwork {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let cache_path = config.feed_cache_path();
        tokio::fs::write(&cache_path, &body).await?;
        tracing::debug!(target: "feed", "Feed document saved to {}", cache_path.display());

        let document: FeedDocument =
            serde_json::from_slice(&body).map_err(|e| PlexupError::FeedParse {
                reason: e.to_string(),
            })?;

        snapshot_for(&document, config)
    }
}

/// Index into the parsed document and apply the platform filter.
pub(crate) fn snapshot_for(
    document: &FeedDocument,
    config: &UpdaterConfig,
) -> Result<FeedSnapshot, PlexupError> {
    let platform = document
        .get(&config.category)
        .and_then(|category| category.get(&config.os))
        .ok_or_else(|| PlexupError::FeedParse {
            reason: format!(
                "feed has no entry for '{}' / '{}'",
                config.category, config.os
            ),
        })?;

    let build = config.build_tag();
    let candidates: Vec<Release> = platform
        .releases
        .iter()
        .filter(|release| release.build == build && release.distro == config.packaging)
        .cloned()
        .collect();

    tracing::debug!(
        target: "feed",
        "Feed advertises version {} with {} matching candidate(s) for {build}/{}",
        platform.version,
        candidates.len(),
        config.packaging
    );

    Ok(FeedSnapshot {
        latest_version: platform.version.clone(),
        candidates,
    })
}

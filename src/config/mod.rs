//! Configuration management for plexup
//!
//! plexup reads a single YAML configuration file describing where the release
//! feed lives and which platform tuple the host presents. The file is loaded
//! once per run and owned by the orchestrator for the run's duration.
//!
//! # File Format
//!
//! ```yaml
//! # Required
//! source: https://plex.tv/api/downloads/5.json
//! os: Linux
//! arch: x86_64
//! packaging: debian
//!
//! # Optional (defaults shown)
//! category: computer
//! package: plexmediaserver
//! service: plexmediaserver
//! preferences: "/var/lib/plexmediaserver/Library/Application Support/Plex Media Server/Preferences.xml"
//! scratch_dir: /tmp
//! download_timeout_secs: 1800
//! ```
//!
//! # File Location
//!
//! The configuration is looked up at `/etc/plexup/config.yml`, falling back
//! to `~/.config/plexup/config.yml`. The `--config` flag overrides both.
//!
//! # Validation
//!
//! All four required fields must be present and non-empty before
//! [`UpdaterConfig::load`] returns; a missing or empty field is a
//! [`PlexupError::ConfigParse`], never a deferred failure later in the run.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::PlexupError;

/// System-wide configuration path checked first.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/plexup/config.yml";

const DEFAULT_CATEGORY: &str = "computer";
const DEFAULT_PACKAGE: &str = "plexmediaserver";
const DEFAULT_PREFERENCES: &str =
    "/var/lib/plexmediaserver/Library/Application Support/Plex Media Server/Preferences.xml";
const DEFAULT_SCRATCH_DIR: &str = "/tmp";
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 1800;

/// Immutable per-run settings loaded from the YAML configuration file.
///
/// The required fields identify the feed and the platform tuple used to
/// filter release candidates; the optional fields default to the values a
/// stock Plex install on Debian uses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdaterConfig {
    /// Release feed URL.
    pub source: String,

    /// Target operating system name, as it appears as a key in the feed
    /// (e.g. `Linux`).
    pub os: String,

    /// Target architecture (e.g. `x86_64`), combined with the lowercased OS
    /// name to form the candidate build tag.
    pub arch: String,

    /// Packaging format identifier matched against the candidate distro tag
    /// (e.g. `debian`).
    pub packaging: String,

    /// Top-level feed category the OS entry lives under.
    #[serde(default = "default_category")]
    pub category: String,

    /// dpkg package name queried by the installed-version probe.
    #[serde(default = "default_package")]
    pub package: String,

    /// systemd unit stopped and started around the install.
    #[serde(default = "default_service")]
    pub service: String,

    /// Live configuration file backed up before the install sequence runs.
    #[serde(default = "default_preferences")]
    pub preferences: PathBuf,

    /// Directory for the feed copy, downloaded artifact, preferences backup,
    /// and the run lock.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Total bound on the artifact download, in seconds. `0` disables the
    /// bound entirely.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_package() -> String {
    DEFAULT_PACKAGE.to_string()
}

fn default_service() -> String {
    DEFAULT_PACKAGE.to_string()
}

fn default_preferences() -> PathBuf {
    PathBuf::from(DEFAULT_PREFERENCES)
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SCRATCH_DIR)
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

impl UpdaterConfig {
    /// Load and validate the configuration from `path`.
    ///
    /// # Errors
    ///
    /// - [`PlexupError::ConfigNotFound`] when `path` does not exist
    /// - [`PlexupError::ConfigIo`] for any other read failure
    /// - [`PlexupError::ConfigParse`] for malformed YAML or a missing/empty
    ///   required field
    pub async fn load(path: &Path) -> Result<Self, PlexupError> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PlexupError::ConfigNotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => {
                return Err(PlexupError::ConfigIo {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let config: Self =
            serde_yaml::from_str(&raw).map_err(|e| PlexupError::ConfigParse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        config.validate(path)?;
        tracing::debug!(target: "config", "Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject configurations whose required fields deserialized to empty
    /// strings, so the failure surfaces at load time with the field name.
    fn validate(&self, path: &Path) -> Result<(), PlexupError> {
        for (name, value) in [
            ("source", &self.source),
            ("os", &self.os),
            ("arch", &self.arch),
            ("packaging", &self.packaging),
        ] {
            if value.trim().is_empty() {
                return Err(PlexupError::ConfigParse {
                    path: path.display().to_string(),
                    reason: format!("field '{name}' must not be empty"),
                });
            }
        }
        Ok(())
    }

    /// Build tag candidates are filtered by: `{os-lowercased}-{arch}`.
    #[must_use]
    pub fn build_tag(&self) -> String {
        format!("{}-{}", self.os.to_lowercase(), self.arch)
    }

    /// Where the fetched feed document is kept for inspection.
    #[must_use]
    pub fn feed_cache_path(&self) -> PathBuf {
        self.scratch_dir.join("plex_versions.json")
    }

    /// Destination path for the downloaded artifact, embedding the target
    /// version.
    #[must_use]
    pub fn artifact_path(&self, version: &str) -> PathBuf {
        self.scratch_dir.join(format!("plex-{version}.deb"))
    }

    /// Versioned backup path for the live preferences file.
    #[must_use]
    pub fn backup_path(&self, version: &str) -> PathBuf {
        self.scratch_dir
            .join(format!("plex-preferences-backup-{version}.xml"))
    }

    /// Total artifact-download bound, or `None` when disabled.
    #[must_use]
    pub fn download_timeout(&self) -> Option<Duration> {
        (self.download_timeout_secs > 0).then(|| Duration::from_secs(self.download_timeout_secs))
    }
}

/// Resolve the configuration file path.
///
/// An explicit `--config` value wins; otherwise the system-wide path is used
/// when present, with the per-user XDG location as the fallback.
#[must_use]
pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }

    let system = PathBuf::from(SYSTEM_CONFIG_PATH);
    if system.exists() {
        return system;
    }

    dirs::config_dir().map_or(system, |dir| dir.join("plexup/config.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL_CONFIG: &str = r#"
source: https://plex.example/api/downloads/5.json
os: Linux
arch: x86_64
packaging: debian
"#;

    async fn load_from_str(yaml: &str) -> Result<UpdaterConfig, PlexupError> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        tokio::fs::write(&path, yaml).await.unwrap();
        UpdaterConfig::load(&path).await
    }

    #[tokio::test]
    async fn loads_required_fields_and_applies_defaults() {
        let config = load_from_str(FULL_CONFIG).await.unwrap();
        assert_eq!(config.source, "https://plex.example/api/downloads/5.json");
        assert_eq!(config.os, "Linux");
        assert_eq!(config.category, "computer");
        assert_eq!(config.package, "plexmediaserver");
        assert_eq!(config.service, "plexmediaserver");
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp"));
        assert_eq!(config.download_timeout_secs, 1800);
    }

    #[tokio::test]
    async fn optional_fields_override_defaults() {
        let yaml = format!("{FULL_CONFIG}\npackage: pms\nservice: pms.service\nscratch_dir: /var/tmp\ndownload_timeout_secs: 0\n");
        let config = load_from_str(&yaml).await.unwrap();
        assert_eq!(config.package, "pms");
        assert_eq!(config.service, "pms.service");
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp"));
        assert_eq!(config.download_timeout(), None);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = UpdaterConfig::load(&dir.path().join("absent.yml")).await;
        assert!(matches!(result, Err(PlexupError::ConfigNotFound { .. })));
    }

    #[tokio::test]
    async fn missing_required_field_is_a_parse_error() {
        let result = load_from_str("source: https://plex.example/feed.json\nos: Linux\n").await;
        match result {
            Err(PlexupError::ConfigParse { reason, .. }) => {
                assert!(reason.contains("arch") || reason.contains("missing field"));
            }
            other => panic!("expected ConfigParse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_required_field_is_a_parse_error() {
        let yaml = "source: https://plex.example/feed.json\nos: \"\"\narch: x86_64\npackaging: debian\n";
        let result = load_from_str(yaml).await;
        match result {
            Err(PlexupError::ConfigParse { reason, .. }) => {
                assert!(reason.contains("'os'"));
            }
            other => panic!("expected ConfigParse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_yaml_is_a_parse_error() {
        let result = load_from_str("{ definitely not yaml").await;
        assert!(matches!(result, Err(PlexupError::ConfigParse { .. })));
    }

    #[tokio::test]
    async fn build_tag_lowercases_the_os() {
        let config = load_from_str(FULL_CONFIG).await.unwrap();
        assert_eq!(config.build_tag(), "linux-x86_64");
    }

    #[tokio::test]
    async fn scratch_paths_embed_the_version() {
        let config = load_from_str(FULL_CONFIG).await.unwrap();
        assert_eq!(
            config.artifact_path("1.40.1.5678-def"),
            PathBuf::from("/tmp/plex-1.40.1.5678-def.deb")
        );
        assert_eq!(
            config.backup_path("1.40.1.5678-def"),
            PathBuf::from("/tmp/plex-preferences-backup-1.40.1.5678-def.xml")
        );
    }

    #[test]
    fn explicit_config_path_wins() {
        let explicit = PathBuf::from("/somewhere/custom.yml");
        assert_eq!(resolve_path(Some(explicit.clone())), explicit);
    }
}

//! Installed-version probe
//!
//! Determines which package version is currently installed by querying dpkg
//! and scanning its output for a version token. Only the Linux/debian path is
//! implemented; any other OS/packaging combination is rejected up front.
//!
//! The probe deliberately ignores dpkg's exit code: some dpkg states (e.g.
//! config-files-only) exit non-zero while still printing a usable `Version:`
//! line, and conversely a zero exit with no version line means the probe has
//! nothing trustworthy to report. Absence of a version match is the
//! authoritative failure signal.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::UpdaterConfig;
use crate::core::PlexupError;
use crate::exec::CommandRunner;

/// Grammar for the version token in `dpkg -s` output:
/// `Version: <digit>.<digits>.<digits>.<digits>-<word>`, case-insensitive,
/// anywhere in the combined output.
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Version:\s*(\d\.\d+\.\d+\.\d+-\w+)").expect("version pattern is valid")
});

/// Query the local package manager for the installed version string.
///
/// # Errors
///
/// - [`PlexupError::ProbeUnsupported`] when the configured OS/packaging is
///   anything other than Linux/debian
/// - [`PlexupError::ExecutionFailed`] when dpkg cannot be invoked
/// - [`PlexupError::ProbeNoMatch`] when no version token is found in the
///   output
pub async fn installed_version<R: CommandRunner>(
    config: &UpdaterConfig,
    runner: &R,
) -> Result<String, PlexupError> {
    if config.os != "Linux" || config.packaging != "debian" {
        return Err(PlexupError::ProbeUnsupported {
            os: config.os.clone(),
            packaging: config.packaging.clone(),
        });
    }

    let output = runner.run("dpkg", &["-s", &config.package]).await?;
    let text = output.combined();

    match VERSION_PATTERN.captures(&text) {
        Some(captures) => {
            let version = captures[1].to_string();
            tracing::debug!(target: "probe", "dpkg reports {} version {}", config.package, version);
            Ok(version)
        }
        None => Err(PlexupError::ProbeNoMatch {
            package: config.package.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{ScriptedRunner, failed_output, ok_output};

    fn config() -> UpdaterConfig {
        UpdaterConfig {
            source: "https://plex.example/feed.json".to_string(),
            os: "Linux".to_string(),
            arch: "x86_64".to_string(),
            packaging: "debian".to_string(),
            category: "computer".to_string(),
            package: "plexmediaserver".to_string(),
            service: "plexmediaserver".to_string(),
            preferences: "/tmp/Preferences.xml".into(),
            scratch_dir: "/tmp".into(),
            download_timeout_secs: 60,
        }
    }

    const DPKG_OUTPUT: &str = "\
Package: plexmediaserver
Status: install ok installed
Priority: optional
Section: video
Maintainer: Plex Inc <support@plex.tv>
Architecture: amd64
Version: 1.40.0.1234-abc
Description: Plex organizes all of your personal media
";

    #[tokio::test]
    async fn extracts_version_from_dpkg_output() {
        let runner = ScriptedRunner::new();
        runner.on("dpkg -s", ok_output(DPKG_OUTPUT));

        let version = installed_version(&config(), &runner).await.unwrap();
        assert_eq!(version, "1.40.0.1234-abc");
        assert_eq!(runner.calls(), vec!["dpkg -s plexmediaserver".to_string()]);
    }

    #[tokio::test]
    async fn matches_case_insensitively() {
        let runner = ScriptedRunner::new();
        runner.on("dpkg -s", ok_output("version: 1.2.33.444-beta9"));

        let version = installed_version(&config(), &runner).await.unwrap();
        assert_eq!(version, "1.2.33.444-beta9");
    }

    #[tokio::test]
    async fn non_zero_exit_with_a_version_line_still_succeeds() {
        let runner = ScriptedRunner::new();
        let mut output = failed_output(1, "dpkg-query: some warning");
        output.stdout = DPKG_OUTPUT.to_string();
        runner.on("dpkg -s", output);

        let version = installed_version(&config(), &runner).await.unwrap();
        assert_eq!(version, "1.40.0.1234-abc");
    }

    #[tokio::test]
    async fn missing_version_line_is_no_match() {
        let runner = ScriptedRunner::new();
        runner.on(
            "dpkg -s",
            failed_output(1, "dpkg-query: package 'plexmediaserver' is not installed"),
        );

        let result = installed_version(&config(), &runner).await;
        assert!(matches!(result, Err(PlexupError::ProbeNoMatch { .. })));
    }

    #[tokio::test]
    async fn partial_version_token_is_no_match() {
        let runner = ScriptedRunner::new();
        // Missing the trailing -<word> build tag.
        runner.on("dpkg -s", ok_output("Version: 1.40.0.1234\n"));

        let result = installed_version(&config(), &runner).await;
        assert!(matches!(result, Err(PlexupError::ProbeNoMatch { .. })));
    }

    #[tokio::test]
    async fn non_linux_os_is_unsupported() {
        let runner = ScriptedRunner::new();
        let mut cfg = config();
        cfg.os = "Darwin".to_string();

        let result = installed_version(&cfg, &runner).await;
        assert!(matches!(result, Err(PlexupError::ProbeUnsupported { .. })));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn non_debian_packaging_is_unsupported() {
        let runner = ScriptedRunner::new();
        let mut cfg = config();
        cfg.packaging = "redhat".to_string();

        let result = installed_version(&cfg, &runner).await;
        assert!(matches!(result, Err(PlexupError::ProbeUnsupported { .. })));
    }

    #[tokio::test]
    async fn spawn_failure_is_an_execution_error() {
        let runner = ScriptedRunner::new();
        runner.fail_on("dpkg -s", "No such file or directory");

        let result = installed_version(&config(), &runner).await;
        assert!(matches!(result, Err(PlexupError::ExecutionFailed { .. })));
    }
}

//! Update orchestrator
//!
//! Composes the feed client, the installed-version probe, the artifact
//! fetcher, and the service adapter into one update run, modeled as an
//! explicit state machine:
//!
//! ```text
//! Idle -> MetadataFetched -> VersionCompared
//!   -> UpToDate                                  (terminal, success)
//!   -> Downloading -> Downloaded -> Verifying
//!        -> VerificationFailed                   (fatal, artifact discarded)
//!        -> Verified -> Installing -> Installed
//!             -> HealthChecking -> Healthy | Unhealthy
//! ```
//!
//! Two different failure policies meet here. Everything up to and including
//! verification is fail-fast: a config, feed, probe, download, or checksum
//! failure aborts the run before the host is touched. The install sequence
//! itself is the opposite - best-effort by design: once a verified artifact
//! exists, every step runs in fixed order, and a failing step is recorded in
//! the [`InstallReport`] and logged but never prevents the following steps.
//! Stopping halfway through a stop/install/start sequence would be worse
//! than pressing on, so the sequence always attempts to bring the service
//! back up and reports what happened.
//!
//! The version gate is exact string equality between the installed version
//! and the feed's latest version. No ordering is attempted: a feed that
//! advertises an older version than the installed one triggers a
//! (re-)install of that older version.

use std::fmt;
use std::path::Path;

use crate::config::UpdaterConfig;
use crate::core::PlexupError;
use crate::exec::{CommandOutput, CommandRunner};
use crate::feed::FeedClient;
use crate::fetch::{self, ArtifactFetcher};
use crate::probe;
use crate::service::{ServiceHealth, ServiceManager};


/// States of one update run, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    MetadataFetched,
    VersionCompared,
    UpToDate,
    Downloading,
    Downloaded,
    Verifying,
    VerificationFailed,
    Verified,
    Installing,
    Installed,
    HealthChecking,
    Healthy,
    Unhealthy,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::MetadataFetched => "metadata-fetched",
            Self::VersionCompared => "version-compared",
            Self::UpToDate => "up-to-date",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Verifying => "verifying",
            Self::VerificationFailed => "verification-failed",
            Self::Verified => "verified",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::HealthChecking => "health-checking",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        };
        f.write_str(name)
    }
}

/// The five steps of the install sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    BackupPreferences,
    StopService,
    InstallPackage,
    StartService,
    CheckHealth,
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BackupPreferences => "backup preferences",
            Self::StopService => "stop service",
            Self::InstallPackage => "install package",
            Self::StartService => "start service",
            Self::CheckHealth => "check health",
        };
        f.write_str(name)
    }
}

/// What happened to a single install step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Ok,
    Failed {
        /// Why the step failed; recorded, never short-circuiting.
        reason: String,
    },
}

/// One executed install step and its result.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: InstallStep,
    pub status: StepStatus,
}

/// Terminal result of the install sequence.
///
/// Constructed only at the end of the sequence and never persisted beyond
/// the run's output and logs.
#[derive(Debug, Clone)]
pub enum InstallOutcome {
    /// The service came back and systemd reports it active.
    Success,
    /// The package was (at least attempted to be) installed, but the service
    /// is not active afterwards. The raw status output is surfaced for
    /// manual intervention.
    ServiceUnhealthyAfterInstall {
        raw_status: String,
    },
    /// The sequence could not run at all; no step was executed.
    Aborted {
        reason: String,
    },
}

/// Step-by-step record of one install sequence.
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Executed steps in order, with per-step results.
    pub steps: Vec<StepRecord>,
    /// Terminal outcome of the sequence.
    pub outcome: InstallOutcome,
}

impl InstallReport {
    /// Whether the sequence ended with a healthy service.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, InstallOutcome::Success)
    }
}

/// Terminal result of one orchestrated run.
#[derive(Debug)]
pub enum RunOutcome {
    /// Installed and advertised versions match; nothing was downloaded or
    /// installed.
    UpToDate {
        version: String,
    },
    /// An update was attempted; the report says how it went.
    Updated {
        from: String,
        to: String,
        report: InstallReport,
    },
}

/// Drives one update run from metadata fetch through health check.
///
/// # Examples
///
/// ```rust,no_run
/// use plexup::config::UpdaterConfig;
/// use plexup::exec::SystemCommandRunner;
/// use plexup::updater::{RunOutcome, UpdateOrchestrator};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = UpdaterConfig::load(std::path::Path::new("/etc/plexup/config.yml")).await?;
/// let runner = SystemCommandRunner;
///
/// let mut orchestrator = UpdateOrchestrator::new(&config, &runner)?;
/// match orchestrator.run().await? {
///     RunOutcome::UpToDate { version } => println!("already on {version}"),
///     RunOutcome::Updated { from, to, report } => {
///         println!("updated {from} -> {to}, healthy: {}", report.succeeded());
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct UpdateOrchestrator<'a, R: CommandRunner> {
    config: &'a UpdaterConfig,
    runner: &'a R,
    feed: FeedClient,
    state: UpdateState,
    force: bool,
    show_progress: bool,
}

impl<'a, R: CommandRunner> UpdateOrchestrator<'a, R> {
    /// Create an orchestrator over the given configuration and command
    /// runner.
    ///
    /// # Errors
    ///
    /// [`PlexupError::HttpClient`] when the feed client cannot be built.
    pub fn new(config: &'a UpdaterConfig, runner: &'a R) -> Result<Self, PlexupError> {
        Ok(Self {
            config,
            runner,
            feed: FeedClient::new()?,
            state: UpdateState::Idle,
            force: false,
            show_progress: true,
        })
    }

    /// Skip the version-equality gate and update even when the versions
    /// match. Download and checksum verification still apply.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Enable or disable the download progress bar.
    #[must_use]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Current state of the run's state machine.
    #[must_use]
    pub fn state(&self) -> UpdateState {
        self.state
    }

    fn transition(&mut self, next: UpdateState) {
        tracing::debug!(target: "updater", "state {} -> {}", self.state, next);
        self.state = next;
    }

    /// Execute one full update run.
    ///
    /// # Errors
    ///
    /// Fatal failures abort the run: feed fetch or probe failures before
    /// anything is downloaded; an empty candidate list
    /// ([`PlexupError::NoCandidate`]); download failures; and a checksum
    /// mismatch ([`PlexupError::ChecksumMismatch`]), which also discards the
    /// artifact. Failures *inside* the install sequence are not errors -
    /// they are recorded in the returned [`InstallReport`].
    pub async fn run(&mut self) -> Result<RunOutcome, PlexupError> {
        let config = self.config;

        let snapshot = self.feed.fetch_latest(config).await?;
        let installed = probe::installed_version(config, self.runner).await?;
        self.transition(UpdateState::MetadataFetched);

        self.transition(UpdateState::VersionCompared);
        tracing::info!(
            target: "updater",
            "Installed version {installed}, feed advertises {}",
            snapshot.latest_version
        );

        if installed == snapshot.latest_version && !self.force {
            self.transition(UpdateState::UpToDate);
            return Ok(RunOutcome::UpToDate { version: installed });
        }

        // First match wins; the feed order is the only tie-break.
        let candidate =
            snapshot
                .candidates
                .first()
                .ok_or_else(|| PlexupError::NoCandidate {
                    build: config.build_tag(),
                    distro: config.packaging.clone(),
                })?;

        self.transition(UpdateState::Downloading);
        let dest = config.artifact_path(&snapshot.latest_version);
        let fetcher =
            ArtifactFetcher::new(config.download_timeout())?.with_progress(self.show_progress);
        let artifact = fetcher.download(&candidate.url, &dest).await?;
        self.transition(UpdateState::Downloaded);

        self.transition(UpdateState::Verifying);
        let digest = fetch::sha1_file(&artifact.path).await?;
        if !fetch::checksum_matches(&candidate.checksum, &digest) {
            self.transition(UpdateState::VerificationFailed);
            if let Err(e) = tokio::fs::remove_file(&artifact.path).await {
                tracing::warn!(
                    target: "updater",
                    "Could not remove untrusted artifact {}: {}",
                    artifact.path.display(),
                    e
                );
            }
            return Err(PlexupError::ChecksumMismatch {
                path: artifact.path.display().to_string(),
                expected: candidate.checksum.clone(),
                actual: digest,
            });
        }
        self.transition(UpdateState::Verified);
        tracing::info!(target: "updater", "Checksum verified for {}", artifact.path.display());

        let report = self.install(&artifact.path, &snapshot.latest_version).await;
        Ok(RunOutcome::Updated {
            from: installed,
            to: snapshot.latest_version,
            report,
        })
    }

    /// The install sequence: backup, stop, install, start, health check.
    ///
    /// Runs every step in fixed order regardless of intermediate failures;
    /// each step's result is recorded and logged.
    async fn install(&mut self, artifact: &Path, version: &str) -> InstallReport {
        self.transition(UpdateState::Installing);
        let config = self.config;
        let runner = self.runner;

        // Without both tools there is nothing sensible to attempt.
        for tool in ["dpkg", "systemctl"] {
            if let Err(e) = runner.locate(tool) {
                tracing::warn!(target: "updater", "Install sequence aborted: {}", e);
                return InstallReport {
                    steps: Vec::new(),
                    outcome: InstallOutcome::Aborted {
                        reason: format!("required tool '{tool}' is not available: {e}"),
                    },
                };
            }
        }

        let mut steps = Vec::new();

        let backup = config.backup_path(version);
        let backup_status = match tokio::fs::copy(&config.preferences, &backup).await {
            Ok(_) => {
                tracing::info!(
                    target: "updater",
                    "Backed up {} -> {}",
                    config.preferences.display(),
                    backup.display()
                );
                StepStatus::Ok
            }
            Err(e) => StepStatus::Failed {
                reason: e.to_string(),
            },
        };
        steps.push(finish_step(InstallStep::BackupPreferences, backup_status));

        let service = ServiceManager::new(&config.service, runner);
        steps.push(record_step(InstallStep::StopService, service.stop().await));

        let artifact_arg = artifact.display().to_string();
        steps.push(record_step(
            InstallStep::InstallPackage,
            runner.run("dpkg", &["-i", &artifact_arg]).await,
        ));
        self.transition(UpdateState::Installed);

        steps.push(record_step(InstallStep::StartService, service.start().await));

        self.transition(UpdateState::HealthChecking);
        let outcome = match service.health().await {
            Ok(ServiceHealth::Healthy) => {
                steps.push(finish_step(InstallStep::CheckHealth, StepStatus::Ok));
                self.transition(UpdateState::Healthy);
                InstallOutcome::Success
            }
            Ok(ServiceHealth::Unhealthy { raw_status }) => {
                steps.push(finish_step(
                    InstallStep::CheckHealth,
                    StepStatus::Failed {
                        reason: "service is not active".to_string(),
                    },
                ));
                self.transition(UpdateState::Unhealthy);
                InstallOutcome::ServiceUnhealthyAfterInstall { raw_status }
            }
            Err(e) => {
                steps.push(finish_step(
                    InstallStep::CheckHealth,
                    StepStatus::Failed {
                        reason: e.to_string(),
                    },
                ));
                self.transition(UpdateState::Unhealthy);
                InstallOutcome::ServiceUnhealthyAfterInstall {
                    raw_status: e.to_string(),
                }
            }
        };

        InstallReport { steps, outcome }
    }
}

/// Fold a command result into a step record, logging the outcome.
fn record_step(
    step: InstallStep,
    result: Result<CommandOutput, PlexupError>,
) -> StepRecord {
    let status = match result {
        Ok(output) if output.success => StepStatus::Ok,
        Ok(output) => {
            let stderr = output.stderr.trim();
            let reason = if stderr.is_empty() {
                format!("exited with code {:?}", output.exit_code)
            } else {
                stderr.to_string()
            };
            StepStatus::Failed { reason }
        }
        Err(e) => StepStatus::Failed {
            reason: e.to_string(),
        },
    };
    finish_step(step, status)
}

fn finish_step(step: InstallStep, status: StepStatus) -> StepRecord {
    match &status {
        StepStatus::Ok => tracing::info!(target: "updater", "Step '{step}' completed"),
        StepStatus::Failed { reason } => {
            tracing::warn!(target: "updater", "Step '{step}' failed: {reason}");
        }
    }
    StepRecord { step, status }
}

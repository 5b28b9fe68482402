//! Command-line interface for plexup
//!
//! Three commands cover the tool's surface:
//!
//! - `check` - fetch the feed and the installed version, report whether an
//!   update is pending; no download, no install
//! - `update` - the full orchestrated run (version gate, download, verify,
//!   install sequence), guarded by the advisory run lock
//! - `status` - installed version plus current service health; no feed
//!   access at all
//!
//! Global options follow the usual conventions: `--verbose` and `--quiet`
//! control log output (mutually exclusive), `--config` overrides the
//! configuration file location, and `--no-progress` disables the download
//! progress bar for scripts and CI logs.
//!
//! # Exit Behavior
//!
//! Commands print human-readable progress to stdout and exit 0 on success,
//! including the "already up to date" case. Fatal pipeline errors and an
//! unhealthy service after install exit 1 with a diagnostic on stderr.

mod check;
mod status;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::{self, UpdaterConfig};

/// Runtime configuration derived from the global CLI flags.
///
/// Holding this separately from the parsed arguments lets tests inject a
/// configuration without re-parsing argv.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level filter; `None` means errors only (quiet mode).
    pub log_level: Option<String>,

    /// Whether to disable progress bars and spinners.
    pub no_progress: bool,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the tracing subscriber for this process.
    ///
    /// `RUST_LOG` wins when set; otherwise the level derived from the
    /// verbosity flags applies. Safe to call more than once - later calls
    /// are no-ops.
    pub fn init_tracing(&self) {
        let default_filter = self.log_level.as_deref().unwrap_or("error");
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }
}

/// Main CLI structure for plexup.
#[derive(Parser)]
#[command(
    name = "plexup",
    about = "Automatic updater for Plex Media Server on Debian-based hosts",
    version,
    long_about = "plexup checks the Plex release feed against the locally installed \
                  package version and, when they differ, downloads the matching .deb, \
                  verifies its checksum, and drives the stop/install/start/verify \
                  sequence."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose (debug-level) log output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file (default: /etc/plexup/config.yml,
    /// falling back to ~/.config/plexup/config.yml).
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable the download progress bar.
    #[arg(long, global = true)]
    no_progress: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check whether the feed advertises a different version.
    ///
    /// Fetches the release feed and the installed version and reports the
    /// comparison. Performs no download and no install.
    Check(check::CheckCommand),

    /// Run the full update: compare, download, verify, install, health-check.
    Update(update::UpdateCommand),

    /// Show the installed version and current service health.
    Status(status::StatusCommand),
}

impl Cli {
    /// Execute the CLI with configuration derived from the parsed flags.
    pub async fn execute(self) -> Result<()> {
        let cli_config = self.build_config();
        self.execute_with_config(cli_config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
        }
    }

    /// Execute with an injected configuration (used by tests).
    pub async fn execute_with_config(self, cli_config: CliConfig) -> Result<()> {
        cli_config.init_tracing();

        let config_path = config::resolve_path(self.config.clone());
        let settings = UpdaterConfig::load(&config_path).await?;

        match self.command {
            Commands::Check(cmd) => cmd.execute(&settings).await,
            Commands::Update(cmd) => cmd.execute(&settings, !cli_config.no_progress).await,
            Commands::Status(cmd) => cmd.execute(&settings).await,
        }
    }
}

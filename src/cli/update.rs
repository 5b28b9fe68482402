//! `plexup update` - the full orchestrated update run.

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;

use crate::config::UpdaterConfig;
use crate::exec::SystemCommandRunner;
use crate::lock::RunLock;
use crate::updater::{InstallOutcome, RunOutcome, StepStatus, UpdateOrchestrator};

/// Run the update: compare versions, download and verify the artifact, and
/// drive the stop/install/start/verify sequence.
///
/// The command takes the advisory run lock first, so a second invocation
/// racing this one fails fast instead of interleaving install sequences.
#[derive(Parser, Debug)]
pub struct UpdateCommand {
    /// Re-download and re-install even when the installed version already
    /// matches the feed. Checksum verification still applies.
    #[arg(short, long)]
    pub force: bool,
}

impl UpdateCommand {
    pub async fn execute(self, config: &UpdaterConfig, show_progress: bool) -> Result<()> {
        let _lock = RunLock::acquire(&config.scratch_dir)?;

        let runner = SystemCommandRunner;
        let mut orchestrator = UpdateOrchestrator::new(config, &runner)?
            .force(self.force)
            .show_progress(show_progress);

        match orchestrator.run().await? {
            RunOutcome::UpToDate { version } => {
                println!(
                    "{}",
                    format!(
                        "Nothing to do, {} is already on the latest version ({version})",
                        config.package
                    )
                    .green()
                );
            }
            RunOutcome::Updated { from, to, report } => {
                for record in &report.steps {
                    match &record.status {
                        StepStatus::Ok => {
                            println!("  {} {}", "ok".green(), record.step);
                        }
                        StepStatus::Failed { reason } => {
                            println!("  {} {} ({reason})", "failed".red(), record.step);
                        }
                    }
                }

                match report.outcome {
                    InstallOutcome::Success => {
                        println!(
                            "{}",
                            format!(
                                "Successfully updated {} {from} -> {to}; service is active",
                                config.package
                            )
                            .green()
                        );
                    }
                    InstallOutcome::ServiceUnhealthyAfterInstall { raw_status } => {
                        println!(
                            "{}",
                            format!(
                                "Updated {} {from} -> {to}, but the service did not come back healthy. Intervention needed.",
                                config.package
                            )
                            .yellow()
                        );
                        println!("Showing `systemctl status {}`:", config.service);
                        println!("{raw_status}");
                        bail!("service '{}' is not active after install", config.service);
                    }
                    InstallOutcome::Aborted { reason } => {
                        bail!("install sequence aborted: {reason}");
                    }
                }
            }
        }

        Ok(())
    }
}

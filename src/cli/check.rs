//! `plexup check` - report whether an update is pending.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::config::UpdaterConfig;
use crate::exec::SystemCommandRunner;
use crate::feed::FeedClient;
use crate::probe;

/// Check for an available update without downloading or installing anything.
///
/// Compares the feed's latest version against the installed version with the
/// same exact string-equality gate the `update` command uses, and also notes
/// when the feed has no candidate for this platform (so an update run would
/// abort).
#[derive(Parser, Debug)]
pub struct CheckCommand {}

impl CheckCommand {
    pub async fn execute(self, config: &UpdaterConfig) -> Result<()> {
        println!("{}", "Checking for updates...".cyan());

        let feed = FeedClient::new()?;
        let snapshot = feed.fetch_latest(config).await?;

        let runner = SystemCommandRunner;
        let installed = probe::installed_version(config, &runner).await?;

        if installed == snapshot.latest_version {
            println!(
                "{}",
                format!("{} is up to date ({installed})", config.package).green()
            );
            return Ok(());
        }

        println!(
            "{}",
            format!("Update available: {installed} -> {}", snapshot.latest_version).green()
        );

        if snapshot.candidates.is_empty() {
            println!(
                "{}",
                format!(
                    "But the feed has no release for build '{}' with packaging '{}'; `plexup update` would abort",
                    config.build_tag(),
                    config.packaging
                )
                .yellow()
            );
        } else {
            println!("Run `plexup update` to install it");
        }

        Ok(())
    }
}

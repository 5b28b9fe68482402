//! `plexup status` - installed version and service health at a glance.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::config::UpdaterConfig;
use crate::exec::SystemCommandRunner;
use crate::probe;
use crate::service::{ServiceHealth, ServiceManager};

/// Show the locally installed version and whether the service is active.
///
/// Purely local: queries dpkg and systemd, never the release feed.
#[derive(Parser, Debug)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(self, config: &UpdaterConfig) -> Result<()> {
        let runner = SystemCommandRunner;

        let installed = probe::installed_version(config, &runner).await?;
        println!("Installed version: {installed}");

        let service = ServiceManager::new(&config.service, &runner);
        match service.health().await? {
            ServiceHealth::Healthy => {
                println!("Service {}: {}", config.service, "active".green());
            }
            ServiceHealth::Unhealthy { raw_status } => {
                println!("Service {}: {}", config.service, "not active".red());
                println!("{raw_status}");
            }
        }

        Ok(())
    }
}

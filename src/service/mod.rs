//! systemd service adapter
//!
//! A narrow boundary around `systemctl` for the three operations the install
//! sequence needs: stop, start, and a health check parsed from `systemctl
//! status` output.
//!
//! The status parser implements a fixed grammar - `Active: <state>
//! (<details>)`, matched case-insensitively anywhere in the output - so the
//! assumption about systemd's text format lives in exactly one place. The
//! captured state value is compared against `active` exactly; anything else,
//! including output with no parseable `Active:` line at all, is reported as
//! unhealthy with the raw output preserved for the operator.

use regex::Regex;
use std::sync::LazyLock;

use crate::core::PlexupError;
use crate::exec::{CommandOutput, CommandRunner};

static ACTIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Active:\s*(\w+)\s*\((\w+)\)").expect("active-state pattern is valid")
});

/// Result of a service health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceHealth {
    /// systemd reports the unit as `active`.
    Healthy,
    /// The unit is in any other state, or the status output was unparseable.
    Unhealthy {
        /// Full raw status output, surfaced for manual intervention.
        raw_status: String,
    },
}

/// Stop/start/status operations for a single systemd unit.
pub struct ServiceManager<'a, R: CommandRunner> {
    unit: &'a str,
    runner: &'a R,
}

impl<'a, R: CommandRunner> ServiceManager<'a, R> {
    pub fn new(unit: &'a str, runner: &'a R) -> Self {
        Self { unit, runner }
    }

    /// `systemctl stop <unit>`.
    pub async fn stop(&self) -> Result<CommandOutput, PlexupError> {
        self.runner.run("systemctl", &["stop", self.unit]).await
    }

    /// `systemctl start <unit>`.
    pub async fn start(&self) -> Result<CommandOutput, PlexupError> {
        self.runner.run("systemctl", &["start", self.unit]).await
    }

    /// Query `systemctl status <unit>` and evaluate the active state.
    ///
    /// # Errors
    ///
    /// [`PlexupError::ExecutionFailed`] when systemctl cannot be invoked;
    /// callers inside the install sequence treat that the same as an
    /// unhealthy result.
    pub async fn health(&self) -> Result<ServiceHealth, PlexupError> {
        let output = self.runner.run("systemctl", &["status", self.unit]).await?;
        Ok(evaluate_status(&output.combined()))
    }
}

/// Apply the `Active: <state> (<details>)` grammar to raw status output.
#[must_use]
pub fn evaluate_status(text: &str) -> ServiceHealth {
    match ACTIVE_PATTERN.captures(text) {
        Some(captures) if &captures[1] == "active" => {
            tracing::debug!(target: "service", "Service is active ({})", &captures[2]);
            ServiceHealth::Healthy
        }
        _ => ServiceHealth::Unhealthy {
            raw_status: text.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{ScriptedRunner, ok_output};

    const ACTIVE_OUTPUT: &str = "\
* plexmediaserver.service - Plex Media Server
     Loaded: loaded (/lib/systemd/system/plexmediaserver.service; enabled)
     Active: active (running) since Tue 2024-04-02 10:00:00 UTC; 5s ago
   Main PID: 4242 (Plex Media Serv)
";

    const FAILED_OUTPUT: &str = "\
* plexmediaserver.service - Plex Media Server
     Loaded: loaded (/lib/systemd/system/plexmediaserver.service; enabled)
     Active: failed (dead) since Tue 2024-04-02 10:00:00 UTC; 2s ago
";

    #[test]
    fn active_running_is_healthy() {
        assert_eq!(evaluate_status(ACTIVE_OUTPUT), ServiceHealth::Healthy);
    }

    #[test]
    fn failed_state_is_unhealthy_with_raw_output() {
        match evaluate_status(FAILED_OUTPUT) {
            ServiceHealth::Unhealthy { raw_status } => {
                assert!(raw_status.contains("Active: failed (dead)"));
            }
            ServiceHealth::Healthy => panic!("failed service must not be healthy"),
        }
    }

    #[test]
    fn unparseable_output_is_unhealthy() {
        let health = evaluate_status("systemctl: command garbled somehow");
        assert!(matches!(health, ServiceHealth::Unhealthy { .. }));
    }

    #[test]
    fn state_value_comparison_is_exact() {
        // The pattern match is case-insensitive, the state comparison is not.
        let health = evaluate_status("Active: ACTIVE (running)");
        assert!(matches!(health, ServiceHealth::Unhealthy { .. }));
    }

    #[test]
    fn activating_state_is_not_healthy() {
        let health = evaluate_status("Active: activating (start) since now");
        assert!(matches!(health, ServiceHealth::Unhealthy { .. }));
    }

    #[tokio::test]
    async fn health_runs_systemctl_status() {
        let runner = ScriptedRunner::new();
        runner.on("systemctl status", ok_output(ACTIVE_OUTPUT));

        let manager = ServiceManager::new("plexmediaserver", &runner);
        assert_eq!(manager.health().await.unwrap(), ServiceHealth::Healthy);
        assert_eq!(
            runner.calls(),
            vec!["systemctl status plexmediaserver".to_string()]
        );
    }

    #[tokio::test]
    async fn stop_and_start_target_the_configured_unit() {
        let runner = ScriptedRunner::new();
        let manager = ServiceManager::new("plexmediaserver", &runner);

        manager.stop().await.unwrap();
        manager.start().await.unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "systemctl stop plexmediaserver".to_string(),
                "systemctl start plexmediaserver".to_string(),
            ]
        );
    }
}

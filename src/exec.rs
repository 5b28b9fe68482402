//! Subprocess execution seam
//!
//! Every external tool plexup talks to (`dpkg`, `systemctl`) goes through the
//! [`CommandRunner`] trait so the probe, the service adapter, and the install
//! sequence can be exercised against canned outputs in tests. The production
//! implementation, [`SystemCommandRunner`], shells out via
//! [`tokio::process::Command`] with captured output and debug-logged argv.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use crate::core::PlexupError;

/// Captured result of a finished external command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, when the process terminated normally.
    pub exit_code: Option<i32>,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl CommandOutput {
    /// Combined stdout and stderr, for parsers that scan everything the tool
    /// printed.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
            (false, true) => self.stdout.clone(),
            _ => self.stderr.clone(),
        }
    }
}

/// Seam for invoking external tools.
///
/// A failed *invocation* (the program could not be started) is an
/// [`PlexupError::ExecutionFailed`]; a program that ran and exited non-zero
/// is an `Ok` result with `success == false`, because several callers treat a
/// non-zero exit as meaningful output rather than an error.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, capturing its output.
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, PlexupError>;

    /// Locate `program` on the PATH without running it.
    fn locate(&self, program: &str) -> Result<PathBuf, PlexupError>;
}

/// Production [`CommandRunner`] backed by real subprocesses.
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, PlexupError> {
        tracing::debug!(target: "exec", "Executing command: {}", render(program, args));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| PlexupError::ExecutionFailed {
                command: render(program, args),
                reason: e.to_string(),
            })?;

        let result = CommandOutput {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success {
            tracing::debug!(
                target: "exec",
                "Command exited with {:?}: {}",
                result.exit_code,
                result.stderr.trim()
            );
        }

        Ok(result)
    }

    fn locate(&self, program: &str) -> Result<PathBuf, PlexupError> {
        which::which(program).map_err(|e| PlexupError::ExecutionFailed {
            command: program.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Render a command line for logs and error messages.
#[must_use]
pub fn render(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted command runner for unit tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A [`CommandRunner`] that replays canned outputs and records every
    /// invocation in order.
    ///
    /// Responses are keyed by `"program first-arg"` (e.g. `"dpkg -s"`,
    /// `"systemctl status"`); unscripted invocations succeed with empty
    /// output so install-sequence steps that nobody cares about in a given
    /// test do not need explicit stubs.
    #[derive(Default)]
    pub struct ScriptedRunner {
        responses: Mutex<HashMap<String, CommandOutput>>,
        failures: Mutex<HashMap<String, String>>,
        missing_tools: Mutex<Vec<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the output for a `"program first-arg"` key.
        pub fn on(&self, key: &str, output: CommandOutput) {
            self.responses.lock().unwrap().insert(key.to_string(), output);
        }

        /// Script an invocation failure for a `"program first-arg"` key.
        pub fn fail_on(&self, key: &str, reason: &str) {
            self.failures.lock().unwrap().insert(key.to_string(), reason.to_string());
        }

        /// Make [`CommandRunner::locate`] fail for `program`.
        pub fn missing_tool(&self, program: &str) {
            self.missing_tools.lock().unwrap().push(program.to_string());
        }

        /// Every invocation so far, rendered as full command lines.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    /// A successful [`CommandOutput`] with the given stdout.
    pub fn ok_output(stdout: &str) -> CommandOutput {
        CommandOutput {
            exit_code: Some(0),
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    /// A failed [`CommandOutput`] with the given exit code and stderr.
    pub fn failed_output(exit_code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            exit_code: Some(exit_code),
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, PlexupError> {
            self.calls.lock().unwrap().push(render(program, args));

            let key = match args.first() {
                Some(first) => format!("{program} {first}"),
                None => program.to_string(),
            };

            if let Some(reason) = self.failures.lock().unwrap().get(&key) {
                return Err(PlexupError::ExecutionFailed {
                    command: render(program, args),
                    reason: reason.clone(),
                });
            }

            Ok(self
                .responses
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .unwrap_or_else(|| ok_output("")))
        }

        fn locate(&self, program: &str) -> Result<PathBuf, PlexupError> {
            if self.missing_tools.lock().unwrap().iter().any(|t| t == program) {
                return Err(PlexupError::ExecutionFailed {
                    command: program.to_string(),
                    reason: "not found on PATH".to_string(),
                });
            }
            Ok(PathBuf::from(format!("/usr/bin/{program}")))
        }
    }
}

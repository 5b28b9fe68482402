//! Shared helpers for binary-level integration tests.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory plus a convenient way to run the real `plexup`
/// binary against configuration files written into it.
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a configuration file into the scratch directory and return its
    /// path.
    pub fn write_config(&self, yaml: &str) -> PathBuf {
        let path = self.dir.path().join("config.yml");
        std::fs::write(&path, yaml).expect("write config");
        path
    }

    /// A command for the compiled `plexup` binary.
    pub fn plexup(&self) -> Command {
        Command::cargo_bin("plexup").expect("plexup binary builds")
    }
}

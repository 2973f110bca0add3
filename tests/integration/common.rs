//! Shared helpers for the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use svi_cli::config::RunConfig;
use svi_cli::test_utils::fixtures::write_file;
use tempfile::TempDir;

/// A temporary directory holding sources and output files for one test.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        svi_cli::test_utils::init_test_logging(None);
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `relative`, returning the absolute path.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        write_file(self.path(), relative, content)
    }

    pub fn read(&self, relative: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.path().join(relative))?)
    }

    /// Absolute path argument for `relative`.
    pub fn arg(&self, relative: &str) -> String {
        self.path().join(relative).display().to_string()
    }

    /// Configuration rewriting `outputs` from `variables`, all relative paths.
    pub fn config(&self, outputs: &[&str], variables: &[&str]) -> RunConfig {
        RunConfig {
            outputs: outputs.iter().map(|o| self.arg(o)).collect(),
            variable_sources: variables.iter().map(|v| self.arg(v)).collect(),
            max_parallel: 8,
            ..RunConfig::default()
        }
    }

    /// The `svi` binary with a clean `SVI_*` environment, run in the project.
    pub fn svi(&self) -> Command {
        let mut cmd = Command::cargo_bin("svi").expect("svi binary");
        for (name, _) in std::env::vars() {
            if name.starts_with("SVI_") || name == "RUST_LOG" {
                cmd.env_remove(name);
            }
        }
        cmd.current_dir(self.path());
        cmd
    }
}

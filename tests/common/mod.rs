//! Shared helpers for CLI integration tests.

#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SYNTAX_LINE: &str = "# syntax=ghcr.io/project-dalec/dalec/frontend:latest";

/// A temporary workspace (with a `.git` marker) and an isolated config file.
pub struct TestProject {
    _temp: TempDir,
    root: PathBuf,
    config: PathBuf,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let root = temp.path().canonicalize()?.join("workspace");
        std::fs::create_dir_all(root.join(".git"))?;
        let config = temp.path().canonicalize()?.join("config.toml");
        std::fs::write(&config, "")?;
        Ok(Self {
            _temp: temp,
            root,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write `content` below the workspace, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Replace the config file contents.
    pub fn write_config(&self, content: &str) -> Result<()> {
        std::fs::write(&self.config, content)?;
        Ok(())
    }

    /// Write an executable shell script below the workspace.
    #[cfg(unix)]
    pub fn write_script(&self, relative: &str, body: &str) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;
        let path = self.write(relative, &format!("#!/bin/sh\n{body}\n"))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    /// `dalec-assist` with the isolated config, no spinners, no colors.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("dalec-assist").expect("binary is built");
        cmd.current_dir(&self.root)
            .arg("--config")
            .arg(&self.config)
            .arg("--no-progress")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Same invocation as [`command`](Self::command) for tests that manage the child.
    pub fn spawnable(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin("dalec-assist"));
        cmd.current_dir(&self.root)
            .arg("--config")
            .arg(&self.config)
            .arg("--no-progress")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> CommandOutput {
        let output = self.command().args(args).output().expect("dalec-assist runs");
        CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        assert!(self.success, "Command failed with code {:?}\nStderr: {}", self.code, self.stderr);
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Expected stdout to contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Expected stderr to contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}

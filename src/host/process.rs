//! Fluent builder for running `docker buildx` (and the shells that run it).
//!
//! All subprocesses go through [`BuildxCommand`] so logging, output limits and error
//! mapping behave the same everywhere:
//!
//! ```rust,no_run
//! use dalec_assist::host::BuildxCommand;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let output = BuildxCommand::new("docker")
//!     .args(["buildx", "build", "--call", "targets,format=json", "-f", "dalec.yml", "."])
//!     .env("BUILDX_EXPERIMENTAL", "1")
//!     .current_dir("/ws")
//!     .with_context("dalec.yml")
//!     .execute_success()
//!     .await?;
//! println!("{}", output.stdout);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::{ProcessOutput, ProcessRequest, ProcessRunner};
use crate::constants::MAX_PROCESS_OUTPUT_BYTES;
use crate::core::DalecError;

/// Builder for a single subprocess invocation.
///
/// Defaults: output captured (20 MiB per stream), inherited environment, current
/// directory of the process. There is no timeout; a hung buildx is a hung command.
pub struct BuildxCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    capture_output: bool,
    max_output: usize,
    context: Option<String>,
}

impl BuildxCommand {
    /// Start a command for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env_vars: Vec::new(),
            capture_output: true,
            max_output: MAX_PROCESS_OUTPUT_BYTES,
            context: None,
        }
    }

    /// Build from a host-level request.
    pub fn from_request(request: &ProcessRequest) -> Self {
        let mut cmd = Self::new(request.program.clone()).args(request.args.iter().cloned());
        if let Some(cwd) = &request.cwd {
            cmd = cmd.current_dir(cwd);
        }
        for (key, value) in &request.env {
            cmd = cmd.env(key.clone(), value.clone());
        }
        if request.max_output > 0 {
            cmd = cmd.max_output(request.max_output);
        }
        cmd
    }

    /// Working directory of the child.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Ceiling on captured bytes per stream; the rest is drained and dropped.
    pub const fn max_output(mut self, bytes: usize) -> Self {
        self.max_output = bytes;
        self
    }

    /// Let the child write straight to the terminal.
    pub const fn inherit_stdio(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Label prefixed to log lines (usually the spec file name).
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn display_command(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First positional argument after the `buildx` prefix, used in error messages.
    fn operation(&self) -> String {
        self.args
            .iter()
            .find(|arg| arg.as_str() != "buildx" && !arg.starts_with('-'))
            .cloned()
            .unwrap_or_else(|| self.program.clone())
    }

    /// Run to completion. A non-zero exit status is reported in the output, not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`DalecError::BuildxNotFound`] when the program does not exist, or an I/O
    /// error if the child cannot be spawned or awaited.
    pub async fn execute(self) -> Result<ProcessOutput> {
        let start = std::time::Instant::now();
        let command_line = self.display_command();
        let ctx = self.context.as_deref().unwrap_or("-");

        tracing::debug!(target: "buildx", "({ctx}) Executing command: {command_line}");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null()).kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env_vars {
            tracing::trace!(target: "buildx", "Setting env var: {key}={value}");
            cmd.env(key, value);
        }
        if self.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DalecError::BuildxNotFound {
                    binary: self.program.clone(),
                }
                .into());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to execute {command_line}"));
            }
        };

        let output = if self.capture_output {
            let stdout = child.stdout.take().context("Child stdout was not captured")?;
            let stderr = child.stderr.take().context("Child stderr was not captured")?;
            let ((stdout, out_cut), (stderr, err_cut), status) = tokio::try_join!(
                read_capped(stdout, self.max_output),
                read_capped(stderr, self.max_output),
                child.wait()
            )
            .with_context(|| format!("Failed to execute {command_line}"))?;

            if out_cut || err_cut {
                tracing::warn!(
                    target: "buildx",
                    "({ctx}) Output exceeded {} bytes and was truncated",
                    self.max_output
                );
            }

            ProcessOutput {
                code: status.code(),
                success: status.success(),
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                truncated: out_cut || err_cut,
            }
        } else {
            let status =
                child.wait().await.with_context(|| format!("Failed to execute {command_line}"))?;
            ProcessOutput {
                code: status.code(),
                success: status.success(),
                ..ProcessOutput::default()
            }
        };

        if !output.success {
            tracing::debug!(target: "buildx", "({ctx}) Command failed with exit code: {:?}", output.code);
            if !output.stderr.is_empty() {
                tracing::debug!(target: "buildx", "({ctx}) Error: {}", output.stderr.trim());
            }
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() >= 1 {
            tracing::info!(
                target: "buildx::perf",
                "({ctx}) {} took {:.2}s",
                self.operation(),
                elapsed.as_secs_f64()
            );
        } else {
            tracing::debug!(
                target: "buildx::perf",
                "({ctx}) {} took {}ms",
                self.operation(),
                elapsed.as_millis()
            );
        }

        Ok(output)
    }

    /// Run and require a zero exit status.
    ///
    /// # Errors
    ///
    /// Everything [`execute`](Self::execute) returns, plus
    /// [`DalecError::BuildxCommandFailed`] on a non-zero exit.
    pub async fn execute_success(self) -> Result<ProcessOutput> {
        let operation = self.operation();
        let output = self.execute().await?;
        ensure_success(&operation, &output)?;
        Ok(output)
    }
}

/// Turn a failed [`ProcessOutput`] into [`DalecError::BuildxCommandFailed`].
///
/// # Errors
///
/// Returns the error when `output.success` is false.
pub fn ensure_success(operation: &str, output: &ProcessOutput) -> Result<()> {
    if output.success {
        return Ok(());
    }
    let stderr = if output.stderr.trim().is_empty() {
        output.stdout.clone()
    } else {
        output.stderr.clone()
    };
    Err(DalecError::BuildxCommandFailed {
        operation: operation.to_string(),
        stderr,
    }
    .into())
}

async fn read_capped<R>(mut reader: R, max: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut reader).take(max as u64).read_to_end(&mut buf).await?;
    let dropped = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((buf, dropped > 0))
}

/// [`ProcessRunner`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, request: &ProcessRequest) -> Result<ProcessOutput> {
        BuildxCommand::from_request(request).execute().await
    }
}

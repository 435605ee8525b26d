//! Capabilities the assistant needs from its host.
//!
//! Everything interactive or external goes through three narrow traits so the build and
//! debug flows can run against a terminal, an editor bridge or test fakes alike:
//!
//! - [`UserPrompts`] - quick-pick lists and free-text input
//! - [`ProcessRunner`] - running `docker buildx` and capturing its output
//! - [`OutputSink`] - user-visible messages and commands sent to a terminal
//!
//! [`console`] implements prompts and output for an interactive terminal, and
//! [`process`] implements the runner on top of `tokio::process`.

pub mod console;
pub mod process;

use anyhow::Result;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;

pub use console::{ConsoleOutput, ConsolePrompts};
pub use process::{BuildxCommand, TokioProcessRunner};

/// One entry of a quick-pick list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickItem {
    /// Main text.
    pub label: String,
    /// Secondary text shown next to the label.
    pub description: Option<String>,
}

impl PickItem {
    /// Item without description.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Parameters of a free-text prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRequest {
    /// Question shown to the user.
    pub prompt: String,
    /// Pre-filled value.
    pub value: Option<String>,
    /// Hint shown when the field is empty.
    pub placeholder: Option<String>,
}

impl InputRequest {
    /// Prompt without value or placeholder.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Pre-fill the field.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Placeholder shown when the field is empty.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }
}

/// Interactive prompts. `Ok(None)` means the user dismissed the prompt.
pub trait UserPrompts: Send + Sync {
    /// Let the user choose one of `items`; returns its index.
    fn quick_pick(
        &self,
        title: &str,
        items: &[PickItem],
    ) -> impl Future<Output = Result<Option<usize>>> + Send;

    /// Ask for a line of text.
    fn input_box(&self, request: &InputRequest) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// A subprocess to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessRequest {
    /// Program name or path.
    pub program: String,
    /// Arguments after the program.
    pub args: Vec<String>,
    /// Working directory; the current directory when `None`.
    pub cwd: Option<PathBuf>,
    /// Extra environment on top of the inherited one.
    pub env: BTreeMap<String, String>,
    /// Ceiling on captured bytes per stream.
    pub max_output: usize,
}

impl ProcessRequest {
    /// `program args...` joined with spaces, for logs and messages.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Output exceeded the ceiling and was cut.
    pub truncated: bool,
}

/// Runs external processes.
pub trait ProcessRunner: Send + Sync {
    /// Run to completion and capture output. A non-zero exit is not an `Err`.
    fn run(&self, request: &ProcessRequest) -> impl Future<Output = Result<ProcessOutput>> + Send;
}

/// A command to show and run in a terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalCommand {
    /// Terminal title.
    pub title: String,
    /// Comment line emitted before the command, already in the shell's syntax.
    pub comment: String,
    /// Shell-quoted command line.
    pub command_line: String,
    /// Working directory.
    pub cwd: PathBuf,
    /// Extra environment.
    pub env: BTreeMap<String, String>,
}

/// User-visible output.
pub trait OutputSink: Send + Sync {
    /// Informational message.
    fn info(&self, message: &str);

    /// Non-blocking warning.
    fn warning(&self, message: &str);

    /// Error shown when an action aborts.
    fn error(&self, message: &str);

    /// Send a command to a terminal.
    fn send_to_terminal(&self, command: &TerminalCommand) -> impl Future<Output = Result<()>> + Send;
}

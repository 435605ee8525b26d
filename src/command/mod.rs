//! Assembly of `docker buildx` command lines.
//!
//! Builds and debug sessions share one argument layout so that the command printed in a
//! terminal and the one given to the debug adapter differ only in the subcommand:
//!
//! ```text
//! docker buildx build     --target T -f SPEC [--build-arg K=V]... [--build-context N=V]... [--no-cache] CONTEXT
//! docker buildx dap build --target T -f SPEC [--build-arg K=V]... [--build-context N=V]... [--no-cache] CONTEXT
//! ```
//!
//! Repeated flags are sorted by name so the same selection always yields the same command.

pub mod shell;

pub use shell::{ShellKind, quote, render_command_line, terminal_command};

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::AssistConfig;
use crate::selection::{ArgsSelection, ContextSelection, is_remote_context};

/// Which buildx subcommand to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// `build`
    Build,
    /// `dap build`, the debug adapter
    Debug,
}

impl BuildMode {
    fn subcommand(self) -> &'static [&'static str] {
        match self {
            Self::Build => &["build"],
            Self::Debug => &["dap", "build"],
        }
    }
}

/// Program plus arguments, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildxInvocation {
    /// Program to execute.
    pub program: String,
    /// Arguments in order.
    pub args: Vec<String>,
}

/// Everything that varies between invocations.
#[derive(Debug, Clone, Copy)]
pub struct BuildInputs<'a> {
    /// Target to build.
    pub target: &'a str,
    /// The Dalec spec.
    pub spec_path: &'a Path,
    /// Positional context: a path or a remote reference.
    pub context: &'a str,
    /// `--build-arg` values.
    pub build_args: &'a BTreeMap<String, String>,
    /// `--build-context` values.
    pub build_contexts: &'a BTreeMap<String, String>,
    /// Add `--no-cache`.
    pub no_cache: bool,
}

impl<'a> BuildInputs<'a> {
    /// Inputs from collected selections.
    pub fn from_selections(
        target: &'a str,
        spec_path: &'a Path,
        contexts: &'a ContextSelection,
        args: &'a ArgsSelection,
        no_cache: bool,
    ) -> Self {
        Self {
            target,
            spec_path,
            context: &contexts.default_context_path,
            build_args: &args.values,
            build_contexts: &contexts.additional_contexts,
            no_cache,
        }
    }
}

/// Remote references pass through; paths are rendered with the platform separator.
fn render_context_value(value: &str) -> String {
    if is_remote_context(value) {
        value.to_string()
    } else {
        Path::new(value).display().to_string()
    }
}

/// Produces invocations for the configured buildx prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAssembler {
    program: String,
    prefix_args: Vec<String>,
}

impl Default for CommandAssembler {
    fn default() -> Self {
        Self::new(&AssistConfig::default())
    }
}

impl CommandAssembler {
    /// Assembler using `[buildx].command`.
    pub fn new(config: &AssistConfig) -> Self {
        Self {
            program: config.buildx_program().to_string(),
            prefix_args: config.buildx_prefix_args().to_vec(),
        }
    }

    /// Assemble the invocation for `mode`.
    pub fn assemble(&self, mode: BuildMode, inputs: &BuildInputs<'_>) -> BuildxInvocation {
        let mut args = self.prefix_args.clone();
        args.extend(mode.subcommand().iter().map(ToString::to_string));
        args.extend([
            "--target".to_string(),
            inputs.target.to_string(),
            "-f".to_string(),
            inputs.spec_path.display().to_string(),
        ]);

        for (name, value) in inputs.build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{name}={value}"));
        }
        for (name, value) in inputs.build_contexts {
            args.push("--build-context".to_string());
            args.push(format!("{name}={}", render_context_value(value)));
        }
        if inputs.no_cache {
            args.push("--no-cache".to_string());
        }
        args.push(render_context_value(inputs.context));

        BuildxInvocation {
            program: self.program.clone(),
            args,
        }
    }
}

//! Command-line interface for dalec-assist.
//!
//! Every subcommand is a thin terminal host around the library: documents are read from
//! disk and handed to the tracker, prompts are drawn with `dialoguer`, subprocesses run
//! through tokio and messages are printed with `colored`.
//!
//! # Available Commands
//!
//! ## Inspection
//! - `inspect` - Show whether a file is a Dalec spec and what it declares
//! - `targets` - List declared targets merged with those reported by the frontend
//! - `schema` - Print the schema URI or schema content for a spec
//!
//! ## Actions
//! - `build` - Pick a target, collect contexts and build args, run `docker buildx build`
//! - `debug` - Same collection, but print the debug launch configuration
//! - `dap` - Run the buildx debug adapter behind a stdio proxy
//! - `session` - Line-driven session that keeps selections and the last action
//!
//! # Examples
//!
//! ```bash
//! dalec-assist inspect dalec.yml --format json
//! dalec-assist build dalec.yml --target azlinux3 --dry-run
//! dalec-assist --verbose targets dalec.yml
//! ```
//!
//! # Logging
//!
//! Logs go to stderr so that stdout stays usable for JSON output and for the debug
//! adapter protocol. `RUST_LOG` overrides the level chosen by `--verbose`/`--quiet`.

mod build;
mod dap;
mod debug;
mod inspect;
mod schema;
mod session;
mod targets;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::AssistConfig;
use crate::host::ConsoleOutput;

/// Output format shared by commands that can print JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable text
    Text,
    /// JSON on stdout
    Json,
}

/// Settings derived from the global flags.
///
/// Kept separate from [`Cli`] so tests can run commands with an explicit configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Log level used when `RUST_LOG` is unset. `None` keeps only errors.
    pub log_level: Option<String>,

    /// Hide spinners.
    pub no_progress: bool,

    /// Suppress informational output.
    pub quiet: bool,

    /// Configuration file to use instead of `~/.dalec-assist/config.toml`.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the stderr subscriber. Safe to call more than once.
    pub fn init_logging(&self) {
        let default_level = self.log_level.as_deref().unwrap_or("error");
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Load the user configuration named by `--config`, or the default one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub async fn load(&self) -> Result<AssistConfig> {
        AssistConfig::load_with_optional(self.config_path.clone()).await
    }

    pub const fn show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }

    /// Console output honouring `--quiet`.
    pub fn output(&self, config: &AssistConfig) -> ConsoleOutput {
        ConsoleOutput::new(config.shell()).quiet(self.quiet)
    }
}

/// Main CLI structure for dalec-assist.
#[derive(Parser)]
#[command(
    name = "dalec-assist",
    about = "Build and debug Dalec specs with docker buildx",
    version,
    author,
    long_about = "dalec-assist recognizes Dalec build specs, discovers their targets, asks for \
                  the build contexts and build args they declare and assembles the matching \
                  docker buildx command or debug adapter launch."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to an alternative configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable progress spinners
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether a file is a Dalec spec and the facts it declares
    Inspect(inspect::InspectCommand),

    /// List the targets of a spec, including those reported by the frontend
    Targets(targets::TargetsCommand),

    /// Build a target of a spec with docker buildx
    Build(build::BuildCommand),

    /// Prepare a debug launch for a target and print it as JSON
    Debug(debug::DebugCommand),

    /// Run the buildx debug adapter, proxying the debug protocol on stdio
    Dap(dap::DapCommand),

    /// Print the schema URI or schema content for a spec
    Schema(schema::SchemaCommand),

    /// Interactive session that remembers selections and the last action
    Session(session::SessionCommand),
}

impl Cli {
    /// Execute the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error; `main` turns it into a user-facing message.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Build the [`CliConfig`] described by the global flags.
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("warn".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
            quiet: self.quiet,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns the command's error.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();
        tracing::debug!("Running with {config:?}");

        match self.command {
            Commands::Inspect(cmd) => cmd.execute().await,
            Commands::Targets(cmd) => cmd.execute(&config).await,
            Commands::Build(cmd) => cmd.execute(&config).await,
            Commands::Debug(cmd) => cmd.execute(&config).await,
            Commands::Dap(cmd) => cmd.execute(&config).await,
            Commands::Schema(cmd) => cmd.execute(&config).await,
            Commands::Session(cmd) => cmd.execute(&config).await,
        }
    }
}

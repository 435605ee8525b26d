//! Build a target of a Dalec spec.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::CliConfig;
use crate::host::{ConsolePrompts, TokioProcessRunner};
use crate::session::{ActionRequest, Session};
use crate::utils::platform::absolute_path;

/// Command to build a spec target with `docker buildx build`.
#[derive(Args)]
pub struct BuildCommand {
    /// Path to the Dalec spec
    file: PathBuf,

    /// Target to build; prompts when omitted
    #[arg(short, long)]
    target: Option<String>,

    /// Pass --no-cache to docker buildx
    #[arg(long)]
    no_cache: bool,

    /// Print the command instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Workspace root used to resolve relative contexts (default: nearest git root)
    #[arg(long)]
    workspace: Option<PathBuf>,
}

impl BuildCommand {
    /// Collect everything the build needs and run it.
    ///
    /// # Errors
    ///
    /// Unrecognized specs, prompt failures and a failing build.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load().await?;
        let output = cli.output(&config).dry_run(self.dry_run);
        let mut session =
            Session::new(config, ConsolePrompts, TokioProcessRunner, output).with_progress(cli.show_progress());
        if let Some(workspace) = &self.workspace {
            session = session.with_workspace(absolute_path(workspace)?);
        }

        let request = ActionRequest {
            spec: Some(self.file),
            target: self.target,
            no_cache: self.no_cache,
        };
        if session.build_current_spec(&request).await?.is_none() {
            tracing::info!("Build cancelled");
        }
        Ok(())
    }
}

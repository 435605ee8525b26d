//! Prepare a debug launch for a spec target.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use super::CliConfig;
use crate::debug::{DebugConfiguration, LaunchDescriptor, LaunchRequest};
use crate::host::{ConsolePrompts, TokioProcessRunner};
use crate::session::{ActionOutcome, ActionRequest, DebugLaunch, Session};
use crate::utils::platform::absolute_path;

/// Command to resolve a debug launch configuration.
///
/// Prints a JSON document with the launch configuration an editor would store, the fully
/// resolved launch and the adapter process to start. Feed the `configuration` part to
/// `dalec-assist dap --launch` to run it.
#[derive(Args)]
pub struct DebugCommand {
    /// Path to the Dalec spec
    file: PathBuf,

    /// Target to debug; prompts when omitted
    #[arg(short, long)]
    target: Option<String>,

    /// Pass --no-cache to docker buildx
    #[arg(long)]
    no_cache: bool,

    /// Workspace root used to resolve relative contexts (default: nearest git root)
    #[arg(long)]
    workspace: Option<PathBuf>,
}

impl DebugCommand {
    /// Collect the launch values and print them.
    ///
    /// # Errors
    ///
    /// Unrecognized specs, prompt failures and invalid launch values.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load().await?;
        let output = cli.output(&config);
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
        match session.debug_current_spec(&request).await? {
            Some(ActionOutcome::Debug(launch)) => print_launch(&launch),
            _ => {
                tracing::info!("Debug cancelled");
                Ok(())
            }
        }
    }
}

#[derive(Serialize)]
struct LaunchDocument<'a> {
    configuration: &'a DebugConfiguration,
    launch: &'a LaunchRequest,
    adapter: &'a LaunchDescriptor,
}

/// Print a prepared debug launch as JSON on stdout.
pub(super) fn print_launch(launch: &DebugLaunch) -> Result<()> {
    let document = LaunchDocument {
        configuration: &launch.configuration,
        launch: &launch.launch,
        adapter: &launch.descriptor,
    };
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

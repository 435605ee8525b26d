//! Run the buildx debug adapter behind the breakpoint-remapping proxy.
//!
//! stdout carries the debug adapter protocol, so nothing but protocol frames may be
//! printed here. Logs and errors go to stderr.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use super::CliConfig;
use crate::command::CommandAssembler;
use crate::core::DalecError;
use crate::debug::{
    DebugConfiguration, adapter_descriptor, resolve_debug_configuration, resolve_with_substituted_variables,
    run_adapter_proxy,
};
use crate::utils::platform::absolute_path;

/// Command to start a debug session from a launch configuration.
#[derive(Args)]
pub struct DapCommand {
    /// JSON launch configuration (as printed under "configuration" by `debug`)
    #[arg(long, value_name = "FILE")]
    launch: PathBuf,

    /// Folder relative paths in the configuration are resolved against (default: current directory)
    #[arg(long)]
    folder: Option<PathBuf>,
}

impl DapCommand {
    /// Resolve the configuration and proxy the adapter until it exits.
    ///
    /// # Errors
    ///
    /// Invalid configurations, a missing buildx binary, protocol errors and a failing
    /// adapter exit status.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load().await?;
        let raw = tokio::fs::read_to_string(&self.launch)
            .await
            .with_context(|| format!("Failed to read launch configuration {}", self.launch.display()))?;
        let configuration: DebugConfiguration =
            serde_json::from_str(&raw).map_err(|e| DalecError::JsonError {
                source_name: self.launch.display().to_string(),
                reason: e.to_string(),
            })?;

        let folder = match &self.folder {
            Some(folder) => absolute_path(folder)?,
            None => std::env::current_dir().context("Failed to determine the current directory")?,
        };

        let configuration = resolve_debug_configuration(configuration, Some(&folder), None)?;
        let launch = resolve_with_substituted_variables(&configuration, Some(&folder)).await?;
        let descriptor = adapter_descriptor(&CommandAssembler::new(&config), &launch, &config.buildx.env);
        tracing::debug!(target: "dap", "Resolved launch {launch:?}");

        let status = run_adapter_proxy(&descriptor, &()).await?;
        if !status.success() {
            return Err(DalecError::BuildxCommandFailed {
                operation: "dap build".to_string(),
                stderr: format!("debug adapter exited with {status}"),
            }
            .into());
        }

        tokio::io::stdout().flush().await.context("Failed to flush debug adapter output")?;
        Ok(())
    }
}

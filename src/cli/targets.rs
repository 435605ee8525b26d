//! List the targets of a spec.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::{CliConfig, OutputFormat};
use crate::core::DalecError;
use crate::host::{ConsolePrompts, TokioProcessRunner};
use crate::session::Session;
use crate::targets::{BuildTargetInfo, merge_targets};
use crate::tracker::{DocumentTracker, TextDocument};

/// Command to list build targets.
#[derive(Args)]
pub struct TargetsCommand {
    /// Path to the Dalec spec
    file: PathBuf,

    /// Only list targets declared in the spec, without asking the frontend
    #[arg(long)]
    static_only: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl TargetsCommand {
    /// List declared targets merged with the frontend's answer.
    ///
    /// # Errors
    ///
    /// Unreadable or unrecognized documents. A failing frontend query only warns.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let targets = if self.static_only {
            let document = TextDocument::load(&self.file).await?;
            let mut tracker = DocumentTracker::default();
            tracker.open(&document);
            let facts = tracker.facts(&document.key).ok_or_else(|| DalecError::NotASpecDocument {
                path: document.path.display().to_string(),
            })?;
            merge_targets(&facts.targets, None)
        } else {
            let config = cli.load().await?;
            let output = cli.output(&config);
            let mut session =
                Session::new(config, ConsolePrompts, TokioProcessRunner, output).with_progress(cli.show_progress());
            session.list_targets(&self.file).await?
        };

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&targets)?),
            OutputFormat::Text => print_targets(&targets),
        }
        Ok(())
    }
}

fn print_targets(targets: &[BuildTargetInfo]) {
    if targets.is_empty() {
        println!("{}", "No targets found".yellow());
        return;
    }
    for target in targets {
        let name = if target.is_default {
            format!("{} {}", target.name.bold(), "(default)".green())
        } else {
            target.name.bold().to_string()
        };
        match &target.description {
            Some(description) => println!("{name}  {}", description.dimmed()),
            None => println!("{name}"),
        }
    }
}

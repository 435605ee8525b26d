//! Show what dalec-assist knows about a document.

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::OutputFormat;
use crate::core::DalecError;
use crate::schema::schema_uri;
use crate::session::{DOCUMENT_ACTIONS, workspace_root_for};
use crate::spec::{FactStrategy, SpecFacts, syntax_image};
use crate::tracker::{DocumentTracker, TextDocument};

/// Fact extraction strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Structural parse with line-scan fallback
    Auto,
    /// Structural parse only
    Structural,
    /// Line scan only
    Heuristic,
}

impl From<StrategyArg> for FactStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Auto => Self::Auto,
            StrategyArg::Structural => Self::Structural,
            StrategyArg::Heuristic => Self::Heuristic,
        }
    }
}

/// Command to inspect a spec file.
#[derive(Args)]
pub struct InspectCommand {
    /// Path to the file
    file: PathBuf,

    /// How to extract facts from the document
    #[arg(long, value_enum, default_value = "auto")]
    strategy: StrategyArg,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    path: PathBuf,
    key: String,
    recognized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    frontend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    facts: Option<SpecFacts>,
    actions: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<String>,
}

impl InspectCommand {
    /// Run the inspection.
    ///
    /// # Errors
    ///
    /// Unreadable files, and in text mode files that are not Dalec specs.
    pub async fn execute(self) -> Result<()> {
        let document = TextDocument::load(&self.file).await?;
        let mut tracker = DocumentTracker::new(self.strategy.into());
        tracker.open(&document);

        let facts = tracker.facts(&document.key);
        let recognized = facts.is_some();
        let report = InspectReport {
            frontend: syntax_image(&document.text),
            actions: if recognized { DOCUMENT_ACTIONS.to_vec() } else { Vec::new() },
            schema: recognized.then(|| schema_uri(Some(&workspace_root_for(&document.path)))),
            path: document.path,
            key: document.key,
            recognized,
            facts,
        };

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
                Ok(())
            }
            OutputFormat::Text => print_text(&report),
        }
    }
}

fn print_text(report: &InspectReport) -> Result<()> {
    let Some(facts) = &report.facts else {
        return Err(DalecError::NotASpecDocument {
            path: report.path.display().to_string(),
        }
        .into());
    };

    println!("{} {} is a Dalec spec", "✓".green(), display_path(&report.path));
    if let Some(frontend) = &report.frontend {
        println!("  {} {}", "Frontend:".bold(), frontend);
    }

    print_list("Targets", &facts.targets);
    print_list("Contexts", &facts.contexts);
    print_args(&facts.args);

    println!("{}", "Actions:".bold());
    for action in &report.actions {
        println!("  {action}");
    }
    Ok(())
}

fn print_list(title: &str, items: &BTreeSet<String>) {
    if items.is_empty() {
        println!("{} {}", format!("{title}:").bold(), "(none)".dimmed());
        return;
    }
    println!("{}", format!("{title}:").bold());
    for item in items {
        println!("  {item}");
    }
}

fn print_args(args: &BTreeMap<String, Option<String>>) {
    if args.is_empty() {
        println!("{} {}", "Build args:".bold(), "(none)".dimmed());
        return;
    }
    println!("{}", "Build args:".bold());
    for (name, default) in args {
        match default {
            Some(value) => println!("  {name} = {value}"),
            None => println!("  {name} {}", "(no default)".dimmed()),
        }
    }
}

fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

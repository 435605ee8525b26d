//! Line-driven session.
//!
//! Unlike the one-shot commands, a session keeps the tracker, the frontend target cache,
//! the selection caches and the last action alive between commands, so repeated builds
//! skip the prompts and `rerun` works.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;

use super::CliConfig;
use super::debug::print_launch;
use crate::host::{ConsoleOutput, ConsolePrompts, OutputSink, TokioProcessRunner};
use crate::session::{ActionKind, ActionOutcome, ActionRequest, Session};
use crate::tracker::{TextDocument, document_key};
use crate::utils::platform::absolute_path;

const HELP: &str = "\
Commands:
  open <file>                  make <file> the active document
  build [file] [target]        build a target (active document when no file is given)
  debug [file] [target]        prepare a debug launch
  rerun [build|debug]          repeat the last action
  targets <file>               list targets
  close <file>                 forget a document
  help                         show this help
  quit                         leave the session";

/// Command to start an interactive session.
#[derive(Args)]
pub struct SessionCommand {
    /// Workspace root used to resolve relative contexts (default: nearest git root)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Print build commands instead of running them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionInput {
    Empty,
    Open(PathBuf),
    Action {
        kind: ActionKind,
        spec: Option<PathBuf>,
        target: Option<String>,
    },
    Rerun(Option<ActionKind>),
    Targets(PathBuf),
    Close(PathBuf),
    Help,
    Quit,
}

fn parse_input(line: &str) -> std::result::Result<SessionInput, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(SessionInput::Empty);
    };
    let rest: Vec<&str> = words.collect();
    let file = |usage: &str| -> std::result::Result<PathBuf, String> {
        match rest.as_slice() {
            [file] => Ok(PathBuf::from(file)),
            _ => Err(format!("usage: {usage}")),
        }
    };

    match command {
        "open" => file("open <file>").map(SessionInput::Open),
        "targets" => file("targets <file>").map(SessionInput::Targets),
        "close" => file("close <file>").map(SessionInput::Close),
        "build" | "debug" => {
            let kind = if command == "build" { ActionKind::Build } else { ActionKind::Debug };
            match rest.as_slice() {
                [] => Ok(SessionInput::Action {
                    kind,
                    spec: None,
                    target: None,
                }),
                [file] => Ok(SessionInput::Action {
                    kind,
                    spec: Some(PathBuf::from(file)),
                    target: None,
                }),
                [file, target] => Ok(SessionInput::Action {
                    kind,
                    spec: Some(PathBuf::from(file)),
                    target: Some((*target).to_string()),
                }),
                _ => Err(format!("usage: {command} [file] [target]")),
            }
        }
        "rerun" => match rest.as_slice() {
            [] => Ok(SessionInput::Rerun(None)),
            ["build"] => Ok(SessionInput::Rerun(Some(ActionKind::Build))),
            ["debug"] => Ok(SessionInput::Rerun(Some(ActionKind::Debug))),
            _ => Err("usage: rerun [build|debug]".to_string()),
        },
        "help" | "?" => Ok(SessionInput::Help),
        "quit" | "exit" => Ok(SessionInput::Quit),
        other => Err(format!("unknown command '{other}' (try 'help')")),
    }
}

async fn read_line() -> Result<Option<String>> {
    tokio::task::spawn_blocking(|| -> Result<Option<String>> {
        print!("{} ", "dalec>".cyan().bold());
        std::io::stdout().flush().ok();
        let mut line = String::new();
        let read = std::io::stdin().read_line(&mut line).context("Failed to read from stdin")?;
        Ok(if read == 0 { None } else { Some(line) })
    })
    .await
    .context("Input task failed")?
}

type ConsoleSession = Session<ConsolePrompts, TokioProcessRunner, ConsoleOutput>;

impl SessionCommand {
    /// Run the session until `quit` or end of input.
    ///
    /// # Errors
    ///
    /// Configuration errors and unreadable stdin. Failed actions are reported and the
    /// session continues.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load().await?;
        let output = cli.output(&config).dry_run(self.dry_run);
        let mut session =
            Session::new(config, ConsolePrompts, TokioProcessRunner, output).with_progress(cli.show_progress());
        if let Some(workspace) = &self.workspace {
            session = session.with_workspace(absolute_path(workspace)?);
        }

        if !cli.quiet {
            println!("{HELP}");
        }
        while let Some(line) = read_line().await? {
            match parse_input(&line) {
                Ok(SessionInput::Quit) => break,
                Ok(input) => handle(&mut session, input).await,
                Err(usage) => session.output().warning(&usage),
            }
        }
        Ok(())
    }
}

async fn handle(session: &mut ConsoleSession, input: SessionInput) {
    match input {
        SessionInput::Empty | SessionInput::Quit => {}
        SessionInput::Help => println!("{HELP}"),
        SessionInput::Open(path) => {
            let document = TextDocument::load(&path).await;
            let Some(document) = session.report(document.map(Some)) else {
                return;
            };
            session.open_document(&document);
            if session.active_document().is_some() {
                session.output().info(&format!("Active: {}", document.path.display()));
            } else {
                session.output().warning(&format!("{} is not a Dalec spec", document.path.display()));
            }
        }
        SessionInput::Action { kind, spec, target } => {
            let request = ActionRequest {
                spec,
                target,
                no_cache: false,
            };
            let result = match kind {
                ActionKind::Build => session.build_current_spec(&request).await,
                ActionKind::Debug => session.debug_current_spec(&request).await,
            };
            show_outcome(session, result);
        }
        SessionInput::Rerun(kind) => {
            let result = session.rerun_last_action(kind).await;
            show_outcome(session, result);
        }
        SessionInput::Targets(path) => {
            let result = session.list_targets(&path).await.map(Some);
            if let Some(targets) = session.report(result) {
                for target in targets {
                    match target.description {
                        Some(description) => println!("{}  {}", target.name.bold(), description.dimmed()),
                        None => println!("{}", target.name.bold()),
                    }
                }
            }
        }
        SessionInput::Close(path) => {
            let key = match absolute_path(&path) {
                Ok(path) => document_key(&path),
                Err(e) => {
                    session.output().error(&format!("{e:#}"));
                    return;
                }
            };
            if session.close_document(&key).is_none() {
                session.output().info(&format!("{} was not tracked", path.display()));
            }
        }
    }
}

fn show_outcome(session: &ConsoleSession, result: Result<Option<ActionOutcome>>) {
    match session.report(result) {
        Some(ActionOutcome::Debug(launch)) => {
            if let Err(e) = print_launch(&launch) {
                session.output().error(&format!("{e:#}"));
            }
        }
        Some(ActionOutcome::Built(_)) | None => {}
    }
}

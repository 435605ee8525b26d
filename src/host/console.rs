//! Terminal host: `dialoguer` prompts and `colored` output.

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};

use super::{BuildxCommand, InputRequest, OutputSink, PickItem, TerminalCommand, UserPrompts};
use crate::utils::platform::shell_invocation;

/// Prompts rendered on the controlling terminal.
///
/// `Esc` dismisses a pick list and `Ctrl-C` dismisses an input field; both count as
/// cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompts;

fn pick_label(item: &PickItem) -> String {
    match &item.description {
        Some(description) => format!("{}  {}", item.label, description.dimmed()),
        None => item.label.clone(),
    }
}

fn is_interrupt(err: &dialoguer::Error) -> bool {
    let dialoguer::Error::IO(io) = err;
    io.kind() == std::io::ErrorKind::Interrupted
}

impl UserPrompts for ConsolePrompts {
    async fn quick_pick(&self, title: &str, items: &[PickItem]) -> Result<Option<usize>> {
        let title = title.to_string();
        let labels: Vec<String> = items.iter().map(pick_label).collect();

        tokio::task::spawn_blocking(move || {
            let result = Select::with_theme(&ColorfulTheme::default())
                .with_prompt(title)
                .items(&labels)
                .default(0)
                .interact_opt();
            match result {
                Ok(selection) => Ok(selection),
                Err(err) if is_interrupt(&err) => Ok(None),
                Err(err) => Err(anyhow::anyhow!("Selection error: {err}")),
            }
        })
        .await
        .context("Prompt task failed")?
    }

    async fn input_box(&self, request: &InputRequest) -> Result<Option<String>> {
        let prompt = match &request.placeholder {
            Some(placeholder) if !placeholder.is_empty() => {
                format!("{} {}", request.prompt, format!("({placeholder})").dimmed())
            }
            _ => request.prompt.clone(),
        };
        let initial = request.value.clone().unwrap_or_default();

        tokio::task::spawn_blocking(move || {
            let result = Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .with_initial_text(initial)
                .allow_empty(true)
                .interact_text();
            match result {
                Ok(value) => Ok(Some(value)),
                Err(err) if is_interrupt(&err) => Ok(None),
                Err(err) => Err(anyhow::anyhow!("Input error: {err}")),
            }
        })
        .await
        .context("Prompt task failed")?
    }
}

/// Messages on stdout/stderr; terminal commands run through the configured shell.
#[derive(Debug, Clone)]
pub struct ConsoleOutput {
    shell: String,
    quiet: bool,
    dry_run: bool,
}

impl ConsoleOutput {
    /// Output that runs terminal commands with `shell`.
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            quiet: false,
            dry_run: false,
        }
    }

    /// Suppress informational messages.
    #[must_use]
    pub const fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Print terminal commands instead of running them.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl OutputSink for ConsoleOutput {
    fn info(&self, message: &str) {
        if !self.quiet {
            println!("{message}");
        }
    }

    fn warning(&self, message: &str) {
        eprintln!("{}: {}", "warning".yellow().bold(), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{}: {}", "error".red().bold(), message);
    }

    async fn send_to_terminal(&self, command: &TerminalCommand) -> Result<()> {
        if !self.quiet {
            eprintln!("{}", command.title.bold());
        }

        if self.dry_run {
            println!("{}", command.comment);
            println!("{}", command.command_line);
            return Ok(());
        }

        if !self.quiet {
            eprintln!("{}", command.comment.dimmed());
            eprintln!("{} {}", "$".cyan(), command.command_line);
        }

        let (program, flag) = shell_invocation(&self.shell);
        let mut cmd = BuildxCommand::new(program)
            .args([flag.to_string(), command.command_line.clone()])
            .current_dir(&command.cwd)
            .with_context(command.title.clone())
            .inherit_stdio();
        for (key, value) in &command.env {
            cmd = cmd.env(key.clone(), value.clone());
        }
        cmd.execute_success().await?;
        Ok(())
    }
}

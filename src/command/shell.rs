//! Rendering an invocation for a shell.

use std::collections::BTreeMap;
use std::path::Path;

use super::BuildxInvocation;
use crate::host::TerminalCommand;
use crate::utils::platform::shell_basename;

/// Shell families that matter for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    /// sh, bash, zsh, fish, ...
    Posix,
    /// `powershell` / `pwsh`
    PowerShell,
    /// `cmd.exe`
    Cmd,
}

impl ShellKind {
    /// Classify a shell path or name.
    pub fn detect(shell: &str) -> Self {
        match shell_basename(shell).as_str() {
            "cmd" => Self::Cmd,
            "powershell" | "pwsh" => Self::PowerShell,
            _ => Self::Posix,
        }
    }

    /// Line comment introducer.
    pub const fn comment_prefix(self) -> &'static str {
        match self {
            Self::Cmd => "REM",
            Self::Posix | Self::PowerShell => "#",
        }
    }
}

/// Double-quote `value` when it contains a space, escaping `"`, `\`, `$` and backticks.
pub fn quote(value: &str) -> String {
    if !value.contains(' ') {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// The whole invocation as one shell line.
pub fn render_command_line(invocation: &BuildxInvocation) -> String {
    std::iter::once(invocation.program.as_str())
        .chain(invocation.args.iter().map(String::as_str))
        .map(quote)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the terminal command for `invocation`, with a comment naming the target and spec.
pub fn terminal_command(
    invocation: &BuildxInvocation,
    shell: &str,
    target: &str,
    spec_path: &Path,
    cwd: &Path,
    env: BTreeMap<String, String>,
) -> TerminalCommand {
    let spec_name = spec_path
        .file_name()
        .map_or_else(|| spec_path.display().to_string(), |name| name.to_string_lossy().into_owned());
    TerminalCommand {
        title: format!("Dalec Build ({target})"),
        comment: format!(
            "{} Dalec build of target '{target}' from {spec_name}",
            ShellKind::detect(shell).comment_prefix()
        ),
        command_line: render_command_line(invocation),
        cwd: cwd.to_path_buf(),
        env,
    }
}

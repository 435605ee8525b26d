//! Platform-specific helpers: home directory, path resolution and shell detection.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dalec_assist::utils::platform::{default_shell_name, resolve_path};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let vendor = resolve_path("~/src/vendor", Path::new("/ws"))?;
//! let shell = default_shell_name();
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Gets the home directory path for the current user.
///
/// # Errors
///
/// Returns an error when the home directory cannot be determined
/// (`%USERPROFILE%` on Windows, `$HOME` elsewhere).
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Expand a leading `~` and resolve relative paths against `base`.
///
/// Only the tilde is expanded; `$VARS` are left alone because buildx context values may
/// legitimately contain them.
///
/// # Errors
///
/// Returns an error when `~` is used but the home directory is unknown.
pub fn resolve_path(value: &str, base: &Path) -> Result<PathBuf> {
    let expanded = if value == "~" || value.starts_with("~/") || value.starts_with("~\\") {
        let home = get_home_dir()?;
        PathBuf::from(shellexpand::tilde_with_context(value, || Some(home.display().to_string())).as_ref())
    } else {
        PathBuf::from(value)
    };

    if expanded.is_absolute() || looks_like_windows_absolute(value) {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}

/// `C:\foo` or `C:/foo`, regardless of the host platform.
pub fn looks_like_windows_absolute(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Make `path` absolute relative to the current directory without touching the filesystem.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Failed to resolve {}", path.display()))
}

/// Checks if a command is available in `PATH`.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Name of the user's shell: `$SHELL` on Unix, `%ComSpec%` on Windows.
pub fn default_shell_name() -> String {
    let var = if is_windows() { "ComSpec" } else { "SHELL" };
    std::env::var(var).unwrap_or_else(|_| if is_windows() { "cmd" } else { "sh" }.to_string())
}

/// Program and flag used to hand a command string to `shell`.
pub fn shell_invocation(shell: &str) -> (String, &'static str) {
    let lower = shell_basename(shell);
    let flag = if lower == "cmd" {
        "/C"
    } else if lower == "powershell" || lower == "pwsh" {
        "-Command"
    } else {
        "-c"
    };
    (shell.to_string(), flag)
}

/// Lowercase file stem of a shell path (`/usr/bin/zsh` -> `zsh`, `C:\...\cmd.exe` -> `cmd`).
pub fn shell_basename(shell: &str) -> String {
    let name = shell.rsplit(['/', '\\']).next().unwrap_or(shell);
    let name = name.strip_suffix(".exe").or_else(|| name.strip_suffix(".EXE")).unwrap_or(name);
    name.to_ascii_lowercase()
}

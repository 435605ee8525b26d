//! Build context values: local paths versus remote references.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::TempDir;

use crate::utils::platform::{looks_like_windows_absolute, resolve_path};

static SCHEME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("scheme regex is valid"));

/// Whether buildx should receive `value` verbatim instead of as a local path.
///
/// Remote values are `type=...` descriptors, URLs (`https://`, `docker-image://`,
/// `oci-layout://`, ...), values still holding a `${...}` placeholder, and `key=value`
/// descriptors without a path separator.
pub fn is_remote_context(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || looks_like_windows_absolute(value) {
        return false;
    }
    value.to_ascii_lowercase().starts_with("type=")
        || SCHEME_REGEX.is_match(value)
        || value.contains("${")
        || (value.contains('=') && !value.contains(['/', '\\']))
}

/// Resolve a prompt answer to the value passed to buildx.
///
/// Empty, `.` and `./` mean the workspace root; remote references pass through; anything
/// else is tilde-expanded and joined onto the workspace root when relative.
///
/// # Errors
///
/// Returns an error when the value starts with `~` and the home directory is unknown.
pub fn resolve_context_value(value: &str, workspace_root: &Path) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == "./" || trimmed == ".\\" {
        return Ok(workspace_root.display().to_string());
    }
    if is_remote_context(trimmed) {
        return Ok(trimmed.to_string());
    }
    Ok(resolve_path(trimmed, workspace_root)?.display().to_string())
}

/// Empty directory handed to buildx when a spec references no context at all.
///
/// Created on first use and removed when dropped.
#[derive(Debug, Default)]
pub struct EmptyContextDir {
    dir: Option<TempDir>,
}

impl EmptyContextDir {
    /// Path of the directory, creating it on first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn path(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.dir {
            return Ok(dir.path().to_path_buf());
        }
        let dir = tempfile::Builder::new()
            .prefix("dalec-empty-context-")
            .tempdir()
            .context("Failed to create empty build context directory")?;
        tracing::debug!("Created empty build context at {}", dir.path().display());
        let path = dir.path().to_path_buf();
        self.dir = Some(dir);
        Ok(path)
    }
}

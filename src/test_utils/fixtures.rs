//! Sample Dalec specs and a throwaway workspace to put them in.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Syntax line used by the fixtures.
pub const SYNTAX_LINE: &str = "# syntax=ghcr.io/project-dalec/dalec/frontend:latest";

/// Builder for spec documents.
#[derive(Debug, Clone, Default)]
pub struct SpecFixture {
    targets: Vec<String>,
    contexts: Vec<Option<String>>,
    args: Vec<(String, Option<String>)>,
}

impl SpecFixture {
    /// Spec with one target, no contexts and no args.
    pub fn basic() -> Self {
        Self::default().target("azlinux3")
    }

    /// Add a target.
    #[must_use]
    pub fn target(mut self, name: &str) -> Self {
        self.targets.push(name.to_string());
        self
    }

    /// Add a source using the default context.
    #[must_use]
    pub fn default_context(mut self) -> Self {
        self.contexts.push(None);
        self
    }

    /// Add a source using a named context.
    #[must_use]
    pub fn named_context(mut self, name: &str) -> Self {
        self.contexts.push(Some(name.to_string()));
        self
    }

    /// Add a build argument.
    #[must_use]
    pub fn arg(mut self, name: &str, default: Option<&str>) -> Self {
        self.args.push((name.to_string(), default.map(ToString::to_string)));
        self
    }

    /// Render the YAML text.
    pub fn render(&self) -> String {
        let mut text = format!("{SYNTAX_LINE}\nname: fixture\nversion: 0.1.0\nrevision: 1\n");

        if !self.args.is_empty() {
            text.push_str("args:\n");
            for (name, default) in &self.args {
                match default {
                    Some(value) => text.push_str(&format!("  {name}: {value}\n")),
                    None => text.push_str(&format!("  {name}:\n")),
                }
            }
        }

        if !self.contexts.is_empty() {
            text.push_str("sources:\n");
            for (index, context) in self.contexts.iter().enumerate() {
                text.push_str(&format!("  src{index}:\n"));
                match context {
                    Some(name) => text.push_str(&format!("    context:\n      name: {name}\n")),
                    None => text.push_str("    context: {}\n"),
                }
            }
        }

        text.push_str("targets:\n");
        for target in &self.targets {
            text.push_str(&format!("  {target}: {{}}\n"));
        }
        text
    }
}

/// Temporary workspace directory.
pub struct TestWorkspace {
    /// Keeps the directory alive.
    pub temp_dir: TempDir,
    /// Workspace root.
    pub root: PathBuf,
}

impl TestWorkspace {
    /// Create an empty workspace.
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().canonicalize()?;
        Ok(Self {
            temp_dir,
            root,
        })
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write a spec fixture.
    pub fn write_spec(&self, relative: &str, spec: &SpecFixture) -> Result<PathBuf> {
        self.write(relative, &spec.render())
    }

    /// Absolute path inside the workspace.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

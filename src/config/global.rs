//! User configuration for dalec-assist.
//!
//! The configuration file lives at `~/.dalec-assist/config.toml` (`%LOCALAPPDATA%\dalec-assist`
//! on Windows) and can be replaced with `--config <path>`. Every key is optional:
//!
//! ```toml
//! [buildx]
//! # Program and leading arguments used to reach buildx
//! command = ["docker", "buildx"]
//! # Pass --no-cache to every build
//! no_cache = false
//!
//! [buildx.env]
//! DOCKER_CONTEXT = "remote-builder"
//!
//! [terminal]
//! # Shell used to run builds; decides quoting and comment syntax
//! shell = "/bin/zsh"
//!
//! [targets]
//! # How long `--call targets` results stay fresh
//! cache_ttl_secs = 300
//!
//! [schema]
//! # Schema used when the workspace has no docs/spec.schema.json
//! bundled = "/opt/dalec/spec.schema.json"
//! ```
//!
//! A missing file means defaults. A file that exists but cannot be read or parsed is an
//! error rather than being silently ignored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    DEFAULT_BUILDX_BINARY, DEFAULT_BUILDX_SUBCOMMAND, FALLBACK_SCHEMA_PATH, FRONTEND_TARGET_CACHE_TTL,
};
use crate::core::DalecError;
use crate::utils::platform::default_shell_name;

fn default_buildx_command() -> Vec<String> {
    vec![DEFAULT_BUILDX_BINARY.to_string(), DEFAULT_BUILDX_SUBCOMMAND.to_string()]
}

const fn default_cache_ttl_secs() -> u64 {
    FRONTEND_TARGET_CACHE_TTL.as_secs()
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AssistConfig {
    /// How buildx is invoked.
    #[serde(default)]
    pub buildx: BuildxConfig,

    /// Terminal used for builds.
    #[serde(default)]
    pub terminal: TerminalConfig,

    /// Target discovery.
    #[serde(default)]
    pub targets: TargetsConfig,

    /// Schema contributor.
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// `[buildx]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildxConfig {
    /// Program followed by the arguments that precede the buildx subcommand.
    #[serde(default = "default_buildx_command")]
    pub command: Vec<String>,

    /// Always pass `--no-cache`.
    #[serde(default)]
    pub no_cache: bool,

    /// Extra environment for every buildx process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Default for BuildxConfig {
    fn default() -> Self {
        Self {
            command: default_buildx_command(),
            no_cache: false,
            env: BTreeMap::new(),
        }
    }
}

/// `[terminal]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TerminalConfig {
    /// Shell path or name; `$SHELL`/`%ComSpec%` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

/// `[targets]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetsConfig {
    /// Freshness window of dynamically discovered targets.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// `[schema]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SchemaConfig {
    /// Bundled fallback schema. Defaults to `schemas/spec.schema.json` in the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundled: Option<PathBuf>,
}

impl AssistConfig {
    /// Load from the default location, or defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, otherwise from the default location.
    ///
    /// An explicitly given path must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML or fails validation.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(&path).await,
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path).await
                } else {
                    tracing::debug!("No config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML or fails validation.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Directory holding the config file and the bundled schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory cannot be determined.
    pub fn config_dir() -> Result<PathBuf> {
        if cfg!(target_os = "windows") {
            Ok(dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("dalec-assist"))
        } else {
            Ok(dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".dalec-assist"))
        }
    }

    /// Default config file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.buildx.command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(DalecError::ConfigError {
                message: "[buildx].command must name a program".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Program that reaches buildx.
    pub fn buildx_program(&self) -> &str {
        self.buildx.command.first().map_or(DEFAULT_BUILDX_BINARY, String::as_str)
    }

    /// Arguments placed between the program and the buildx subcommand.
    pub fn buildx_prefix_args(&self) -> &[String] {
        self.buildx.command.get(1..).unwrap_or_default()
    }

    /// Configured shell, or the user's login shell.
    pub fn shell(&self) -> String {
        self.terminal.shell.clone().unwrap_or_else(default_shell_name)
    }

    /// Freshness window for discovered targets.
    pub const fn target_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.targets.cache_ttl_secs)
    }

    /// Bundled fallback schema location.
    pub fn bundled_schema_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.schema.bundled {
            return Some(path.clone());
        }
        let dir = Self::config_dir().ok()?;
        Some(FALLBACK_SCHEMA_PATH.iter().fold(dir, |path, part| path.join(part)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AssistConfig::default();
        assert_eq!(config.buildx_program(), "docker");
        assert_eq!(config.buildx_prefix_args(), ["buildx".to_string()]);
        assert!(!config.buildx.no_cache);
        assert_eq!(config.target_cache_ttl(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[buildx]
command = ["podman", "buildx"]
no_cache = true

[buildx.env]
DOCKER_CONTEXT = "remote"

[terminal]
shell = "pwsh"
"#,
        )
        .unwrap();

        let config = AssistConfig::load_from(&path).await.unwrap();
        assert_eq!(config.buildx_program(), "podman");
        assert!(config.buildx.no_cache);
        assert_eq!(config.buildx.env.get("DOCKER_CONTEXT").map(String::as_str), Some("remote"));
        assert_eq!(config.shell(), "pwsh");
        assert_eq!(config.targets.cache_ttl_secs, 300);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[buildx\n").unwrap();

        let err = AssistConfig::load_from(&path).await.unwrap_err();
        assert!(err.downcast_ref::<toml::de::Error>().is_some());
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[buildx]\ncommand = []\n").unwrap();

        let err = AssistConfig::load_from(&path).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<DalecError>(), Some(DalecError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn test_explicit_missing_path_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = AssistConfig::load_with_optional(Some(temp.path().join("missing.toml"))).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_bundled_schema_override() {
        let mut config = AssistConfig::default();
        config.schema.bundled = Some(PathBuf::from("/opt/schema.json"));
        assert_eq!(config.bundled_schema_path(), Some(PathBuf::from("/opt/schema.json")));
    }
}

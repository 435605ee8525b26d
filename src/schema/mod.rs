//! JSON schema contributor for YAML language services.
//!
//! Validation services ask two questions: which schema applies to a document, and what
//! the content behind a schema URI is. Tracked Dalec specs map to
//! `dalecspec://<percent-encoded workspace URI>/spec`, or `dalecspec://global/spec` when
//! the document belongs to no workspace. The content is the workspace's
//! `docs/spec.schema.json` when present, otherwise the bundled schema.

use std::path::{Path, PathBuf};

use crate::config::AssistConfig;
use crate::constants::{SCHEMA_GLOBAL_AUTHORITY, SCHEMA_SCHEME, WORKSPACE_SCHEMA_PATH};
use crate::host::OutputSink;
use crate::tracker::DocumentTracker;

/// Schema URI for the workspace rooted at `workspace`, or the global one.
pub fn schema_uri(workspace: Option<&Path>) -> String {
    let authority = workspace
        .and_then(|root| url::Url::from_directory_path(root).ok())
        .map_or_else(|| SCHEMA_GLOBAL_AUTHORITY.to_string(), |url| {
            let url = url.as_str().trim_end_matches('/');
            urlencoding::encode(url).into_owned()
        });
    format!("{SCHEMA_SCHEME}://{authority}/spec")
}

/// Workspace encoded in a schema URI. `None` for the global URI or anything unparseable.
pub fn workspace_from_uri(uri: &str) -> Option<PathBuf> {
    let rest = uri.strip_prefix(SCHEMA_SCHEME)?.strip_prefix("://")?;
    let authority = rest.split('/').next()?;
    if authority.is_empty() || authority == SCHEMA_GLOBAL_AUTHORITY {
        return None;
    }
    let decoded = urlencoding::decode(authority).ok()?;
    url::Url::parse(&decoded).ok()?.to_file_path().ok()
}

/// Answers schema requests for tracked documents.
#[derive(Debug, Clone)]
pub struct SchemaContributor {
    bundled: Option<PathBuf>,
}

impl SchemaContributor {
    /// Contributor using the configured bundled schema.
    pub fn new(config: &AssistConfig) -> Self {
        Self {
            bundled: config.bundled_schema_path(),
        }
    }

    /// Contributor with an explicit fallback schema.
    pub fn with_bundled(bundled: impl Into<PathBuf>) -> Self {
        Self {
            bundled: Some(bundled.into()),
        }
    }

    /// Schema URI for `key`, only when the tracker considers it a Dalec spec.
    pub fn schema_for_document(&self, tracker: &DocumentTracker, key: &str, workspace: Option<&Path>) -> Option<String> {
        tracker.is_tracked(key).then(|| schema_uri(workspace))
    }

    /// Content behind `uri`. Reports through `output` when no schema can be read.
    pub async fn schema_content<O: OutputSink>(&self, uri: &str, output: &O) -> Option<String> {
        if let Some(workspace) = workspace_from_uri(uri) {
            let local = WORKSPACE_SCHEMA_PATH.iter().fold(workspace, |path, part| path.join(part));
            match tokio::fs::read_to_string(&local).await {
                Ok(content) => {
                    tracing::debug!("Using workspace schema {}", local.display());
                    return Some(content);
                }
                Err(e) => tracing::debug!("No workspace schema at {}: {e}", local.display()),
            }
        }

        let Some(bundled) = &self.bundled else {
            output.error("Unable to load Dalec spec schema: no bundled schema location is known");
            return None;
        };
        match tokio::fs::read_to_string(bundled).await {
            Ok(content) => Some(content),
            Err(e) => {
                output.error(&format!("Unable to load Dalec spec schema ({}): {e}", bundled.display()));
                None
            }
        }
    }
}

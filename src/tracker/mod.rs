//! Live tracking of open Dalec spec documents.
//!
//! The tracker owns the mapping from document key (a `file://` URI) to the facts most
//! recently extracted from that document. It is driven purely by document events:
//!
//! ```text
//!            open/change (recognized)            close
//!  Untracked ─────────────────────────► Tracked ───────► Untracked
//!                                        │  ▲
//!                                        └──┘ change (recognized): facts recomputed
//!                 change (not recognized / not YAML) ──► Untracked
//! ```
//!
//! Every transition into or within `Tracked`, and every eviction, produces exactly one
//! [`TrackerEvent`] for the affected document. Events are broadcast to subscribers and
//! also returned to the caller.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

use crate::spec::{self, FactStrategy, SpecFacts};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A text document as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    /// Stable identity, a `file://` URI for documents on disk.
    pub key: String,
    /// Filesystem path of the document.
    pub path: PathBuf,
    /// Host language tag (`yaml`, `yml`, ...).
    pub language_id: String,
    /// Monotonic version, bumped by the host on every edit.
    pub version: i64,
    /// Full document text.
    pub text: String,
}

impl TextDocument {
    /// Build a document snapshot for an in-memory text.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            key: document_key(&path),
            language_id: language_for_path(&path).to_string(),
            path,
            version: 1,
            text: text.into(),
        }
    }

    /// Read a document from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn load(path: &Path) -> Result<Self> {
        let path = crate::utils::platform::absolute_path(path)?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::new(path, text))
    }

    /// Same document, new contents.
    #[must_use]
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            version: self.version + 1,
            ..self.clone()
        }
    }
}

/// Stable key for a path: its `file://` URI, or the plain path if it cannot be expressed
/// as one (relative paths).
pub fn document_key(path: &Path) -> String {
    url::Url::from_file_path(path).map_or_else(|()| path.display().to_string(), |url| url.to_string())
}

/// Host-style language tag derived from the file extension.
pub fn language_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("yml" | "yaml") => "yaml",
        Some("json") => "json",
        _ => "plaintext",
    }
}

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerEventKind {
    /// Facts were (re)computed.
    Tracked,
    /// The document is no longer tracked.
    Untracked,
}

/// Change notification for a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerEvent {
    /// Affected document key.
    pub key: String,
    /// Transition kind.
    pub kind: TrackerEventKind,
}

/// Snapshot of a tracked document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedDocument {
    /// Document key.
    pub key: String,
    /// Filesystem path.
    pub path: PathBuf,
    /// Host version the facts were computed from.
    pub version: i64,
    /// Extracted facts.
    pub facts: SpecFacts,
    /// Full text the facts were computed from.
    pub text: String,
}

/// Tracks recognized Dalec specs.
pub struct DocumentTracker {
    tracked: HashMap<String, TrackedDocument>,
    strategy: FactStrategy,
    events: broadcast::Sender<TrackerEvent>,
}

impl Default for DocumentTracker {
    fn default() -> Self {
        Self::new(FactStrategy::default())
    }
}

impl DocumentTracker {
    /// Create an empty tracker using `strategy` for fact extraction.
    pub fn new(strategy: FactStrategy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            tracked: HashMap::new(),
            strategy,
            events,
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    /// A document was opened.
    pub fn open(&mut self, document: &TextDocument) -> Option<TrackerEvent> {
        self.evaluate(document)
    }

    /// A document was edited (or its language changed).
    pub fn change(&mut self, document: &TextDocument) -> Option<TrackerEvent> {
        self.evaluate(document)
    }

    /// A document was closed.
    pub fn close(&mut self, key: &str) -> Option<TrackerEvent> {
        self.evict(key)
    }

    /// Whether `key` is currently tracked.
    pub fn is_tracked(&self, key: &str) -> bool {
        self.tracked.contains_key(key)
    }

    /// Snapshot of a tracked document.
    pub fn get(&self, key: &str) -> Option<TrackedDocument> {
        self.tracked.get(key).cloned()
    }

    /// Snapshot of the facts for `key`.
    pub fn facts(&self, key: &str) -> Option<SpecFacts> {
        self.tracked.get(key).map(|doc| doc.facts.clone())
    }

    /// Keys of all tracked documents, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.tracked.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn evaluate(&mut self, document: &TextDocument) -> Option<TrackerEvent> {
        if !is_yaml_document(document) {
            return self.evict(&document.key);
        }

        let Some(facts) = spec::extract_facts_with(&document.text, self.strategy) else {
            return self.evict(&document.key);
        };

        tracing::debug!(
            target: "tracker",
            "Tracking {} (v{}): {} targets, {} contexts, {} args",
            document.key,
            document.version,
            facts.targets.len(),
            facts.contexts.len(),
            facts.args.len()
        );

        self.tracked.insert(
            document.key.clone(),
            TrackedDocument {
                key: document.key.clone(),
                path: document.path.clone(),
                version: document.version,
                facts,
                text: document.text.clone(),
            },
        );
        Some(self.emit(&document.key, TrackerEventKind::Tracked))
    }

    fn evict(&mut self, key: &str) -> Option<TrackerEvent> {
        self.tracked.remove(key)?;
        tracing::debug!(target: "tracker", "No longer tracking {key}");
        Some(self.emit(key, TrackerEventKind::Untracked))
    }

    fn emit(&self, key: &str, kind: TrackerEventKind) -> TrackerEvent {
        let event = TrackerEvent {
            key: key.to_string(),
            kind,
        };
        // No subscribers is fine.
        let _ = self.events.send(event.clone());
        event
    }
}

fn is_yaml_document(document: &TextDocument) -> bool {
    let file_name = document.path.to_string_lossy().to_lowercase();
    (file_name.ends_with(".yml") || file_name.ends_with(".yaml"))
        && matches!(document.language_id.as_str(), "yaml" | "yml")
}

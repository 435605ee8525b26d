//! Dalec spec recognition and fact extraction.
//!
//! A document is a Dalec spec when its first non-blank line is a syntax marker pointing at
//! the Dalec frontend:
//!
//! ```yaml
//! # syntax=ghcr.io/project-dalec/dalec/frontend:latest
//! name: my-package
//! args:
//!   VERSION: 1.0.0
//! sources:
//!   src:
//!     context: {}
//!   vendor:
//!     context:
//!       name: vendor
//! targets:
//!   azlinux3: {}
//!   jammy: {}
//! ```
//!
//! From a recognized spec three facts are extracted:
//!
//! - **targets** - keys of the top-level `targets` mapping
//! - **contexts** - names of every `context` reference; an unnamed reference is the
//!   default context, called `"context"`
//! - **args** - build arguments with their optional default values
//!
//! Extraction never fails upward. A spec that does not parse as YAML is still a spec; the
//! line scanner in [`heuristic`] is used instead, and anything neither strategy finds is
//! simply absent.

pub mod heuristic;
pub mod structural;

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::constants::DEFAULT_CONTEXT_NAME;

/// First-line marker. `sytnax` is a common misspelling that buildx itself tolerates.
static SYNTAX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^#\s*(?:syntax|sytnax)\s*=\s*(?P<image>ghcr\.io/(?:project-dalec|azure)/dalec/frontend:[^\s#]+|[^\s#]*dalec[^\s#]*)",
    )
    .expect("syntax marker regex is valid")
});

/// Facts extracted from a recognized spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpecFacts {
    /// Declared target names (may contain `/`).
    pub targets: BTreeSet<String>,
    /// Referenced build context names, `"context"` for the default one.
    pub contexts: BTreeSet<String>,
    /// Declared build arguments and their default values.
    pub args: BTreeMap<String, Option<String>>,
}

impl SpecFacts {
    /// Named contexts other than the default one.
    pub fn named_contexts(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().map(String::as_str).filter(|name| *name != DEFAULT_CONTEXT_NAME)
    }
}

/// Which extraction strategy to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FactStrategy {
    /// Structural parse, falling back to the line scanner when the YAML is invalid.
    #[default]
    Auto,
    /// Structural parse only; invalid YAML yields empty facts.
    Structural,
    /// Line scanner only.
    Heuristic,
}

/// Returns the frontend image named by the syntax marker, if the text is a Dalec spec.
pub fn syntax_image(text: &str) -> Option<String> {
    let first_line = text.lines().map(str::trim).find(|line| !line.is_empty())?;
    SYNTAX_REGEX
        .captures(first_line)
        .and_then(|caps| caps.name("image"))
        .map(|image| image.as_str().to_string())
}

/// Whether the first non-blank line is a Dalec syntax marker.
pub fn is_spec_document(text: &str) -> bool {
    syntax_image(text).is_some()
}

/// Extract facts with the default strategy. `None` means "not a Dalec spec".
pub fn extract_facts(text: &str) -> Option<SpecFacts> {
    extract_facts_with(text, FactStrategy::Auto)
}

/// Extract facts with an explicit strategy. `None` means "not a Dalec spec".
pub fn extract_facts_with(text: &str, strategy: FactStrategy) -> Option<SpecFacts> {
    if !is_spec_document(text) {
        return None;
    }

    let facts = match strategy {
        FactStrategy::Heuristic => heuristic::extract(text),
        FactStrategy::Structural => structural::extract(text).unwrap_or_else(|err| {
            tracing::debug!(target: "spec", "Structural parse failed: {err}");
            SpecFacts::default()
        }),
        FactStrategy::Auto => match structural::extract(text) {
            Ok(facts) => facts,
            Err(err) => {
                tracing::debug!(target: "spec", "Structural parse failed, scanning lines: {err}");
                heuristic::extract(text)
            }
        },
    };

    Some(facts)
}

/// Normalize a context name taken from raw document text.
///
/// Trims, drops a trailing comment, strips trailing `,`/`}` left over from inline
/// mappings and one layer of matching quotes. An empty result names the default context.
pub fn sanitize_context_name(raw: &str) -> String {
    let mut name = raw.trim();
    if let Some(idx) = name.find('#') {
        name = name[..idx].trim();
    }
    name = name.trim_end_matches([',', '}']).trim();
    let name = strip_matching_quotes(name).trim();

    if name.is_empty() {
        DEFAULT_CONTEXT_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Strip exactly one layer of surrounding `'` or `"` quotes.
pub(crate) fn strip_matching_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return &value[1..value.len() - 1];
        }
    }
    value
}

//! Parsing of `docker buildx build --call targets` output.
//!
//! With `format=json` buildx prints an object with a `targets` array, sometimes after
//! progress noise. Older versions (or a different frontend) print a table instead:
//!
//! ```text
//! TARGET              DESCRIPTION
//! azlinux3 (default)  Build an azlinux3 package
//! jammy/testing/container  Test container
//! ```

use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::BuildTargetInfo;

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9._/-]+)(.*)$").expect("target name regex is valid"));

static HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^target").expect("header regex is valid"));

const DEFAULT_MARKER: &str = "(default)";

#[derive(Debug, Deserialize)]
struct TargetListing {
    #[serde(default)]
    targets: Vec<ListedTarget>,
}

#[derive(Debug, Deserialize)]
struct ListedTarget {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    default: bool,
}

/// Parse buildx output, preferring the JSON payload over the text table.
pub fn parse_targets_output(output: &str) -> Vec<BuildTargetInfo> {
    match parse_json(output) {
        Some(targets) if !targets.is_empty() => targets,
        _ => parse_lines(output),
    }
}

/// JSON starting at the first `{`. Trailing output after the object is ignored.
fn parse_json(output: &str) -> Option<Vec<BuildTargetInfo>> {
    let start = output.find('{')?;
    let mut stream =
        serde_json::Deserializer::from_str(&output[start..]).into_iter::<TargetListing>();
    let listing = match stream.next()? {
        Ok(listing) => listing,
        Err(err) => {
            tracing::debug!(target: "targets", "Target output is not JSON: {err}");
            return None;
        }
    };

    let mut seen = HashSet::new();
    Some(
        listing
            .targets
            .into_iter()
            .filter(|target| !target.name.trim().is_empty() && seen.insert(target.name.clone()))
            .map(|target| BuildTargetInfo {
                name: target.name,
                description: target
                    .description
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty()),
                is_default: target.default,
            })
            .collect(),
    )
}

/// Text table fallback: one target per line, header and separator lines skipped.
fn parse_lines(output: &str) -> Vec<BuildTargetInfo> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || HEADER_REGEX.is_match(trimmed)
            || trimmed.starts_with('=')
            || trimmed.starts_with('-')
        {
            continue;
        }

        let Some(caps) = NAME_REGEX.captures(trimmed) else {
            continue;
        };
        let name = caps[1].to_string();
        if !seen.insert(name.clone()) {
            continue;
        }

        let (description, is_default) = split_description(&caps[2]);
        targets.push(BuildTargetInfo {
            name,
            description,
            is_default,
        });
    }

    targets
}

fn split_description(rest: &str) -> (Option<String>, bool) {
    let mut rest = rest.trim();
    let is_default = rest.starts_with(DEFAULT_MARKER);
    if is_default {
        rest = rest[DEFAULT_MARKER.len()..].trim_start();
    }
    let rest = rest.trim_start_matches(['-', ':', '|']).trim();
    let description = (!rest.is_empty()).then(|| rest.to_string());
    (description, is_default)
}

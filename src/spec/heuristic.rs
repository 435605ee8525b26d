//! Line-scanning fact extraction.
//!
//! Used when the document does not parse as YAML (typically while it is being edited).
//! The scanner only looks at indentation and `key:` shapes. Tabs count as two spaces, and
//! only the first `targets:` and the first `args:` block in the document are honored.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use super::{SpecFacts, sanitize_context_name, strip_matching_quotes};
use crate::constants::DEFAULT_CONTEXT_NAME;

static TARGETS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)targets\s*:(.*)$").expect("valid regex"));
static ARGS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)args\s*:(.*)$").expect("valid regex"));
static BLOCK_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)([^\s:#]+)\s*:(.*)$").expect("valid regex"));
static CONTEXT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\s*(?:-\s+)?)context\s*:(.*)$").expect("valid regex"));
static NAME_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:-\s+)?name\s*:(.*)$").expect("valid regex"));

/// Scan `text` line by line.
pub fn extract(text: &str) -> SpecFacts {
    let lines: Vec<String> = text.lines().map(|line| line.replace('\t', "  ")).collect();

    SpecFacts {
        targets: extract_targets(&lines),
        contexts: extract_contexts(&lines),
        args: extract_args(&lines),
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Strip a trailing ` # comment` from a scalar remainder.
fn strip_comment(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.starts_with('#') {
        return "";
    }
    let mut prev_is_space = false;
    for (idx, ch) in trimmed.char_indices() {
        if ch == '#' && prev_is_space {
            return trimmed[..idx].trim_end();
        }
        prev_is_space = ch.is_whitespace();
    }
    trimmed
}

/// Keys of the block starting after line `start`, whose own indentation is `base`.
///
/// Only keys at the first nested indentation level count; deeper keys belong to the
/// entries themselves.
fn block_entries(lines: &[String], start: usize, base: usize) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    let mut child_indent = None;

    for line in &lines[start + 1..] {
        if is_skippable(line) {
            continue;
        }
        let indent = indent_of(line);
        if indent <= base {
            break;
        }
        let Some(caps) = BLOCK_KEY.captures(line) else {
            continue;
        };
        let level = *child_indent.get_or_insert(indent);
        if indent != level {
            continue;
        }
        let key = strip_matching_quotes(&caps[2]).to_string();
        entries.push((key, caps[3].to_string()));
    }

    entries
}

/// Split the body of an inline mapping `{ a: 1, b: {c: 2} }` into top-level pairs.
fn inline_entries(remainder: &str) -> Option<Vec<(String, String)>> {
    let body = strip_comment(remainder);
    let body = body.strip_prefix('{')?;
    let body = body.strip_suffix('}').unwrap_or(body);

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut current = String::new();
    for ch in body.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '{' | '[') => {
                depth += 1;
                current.push(ch);
            }
            (None, '}' | ']') => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            (None, ',') if depth == 0 => parts.push(std::mem::take(&mut current)),
            (None, c) => current.push(c),
        }
    }
    parts.push(current);

    let entries = parts
        .iter()
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let (key, value) = part.split_once(':').unwrap_or((part, ""));
            let key = strip_matching_quotes(key.trim()).to_string();
            (!key.is_empty()).then(|| (key, value.trim().to_string()))
        })
        .collect();
    Some(entries)
}

fn extract_targets(lines: &[String]) -> BTreeSet<String> {
    let Some((idx, caps)) =
        lines.iter().enumerate().find_map(|(idx, line)| TARGETS_BLOCK.captures(line).map(|c| (idx, c)))
    else {
        return BTreeSet::new();
    };

    if let Some(entries) = inline_entries(&caps[2]) {
        return entries.into_iter().map(|(key, _)| key).collect();
    }

    block_entries(lines, idx, caps[1].len()).into_iter().map(|(key, _)| key).collect()
}

fn default_value(raw: &str) -> Option<String> {
    let value = strip_matching_quotes(strip_comment(raw).trim_end_matches(',').trim()).to_string();
    match value.as_str() {
        "" | "~" | "null" => None,
        _ => Some(value),
    }
}

fn extract_args(lines: &[String]) -> BTreeMap<String, Option<String>> {
    let Some((idx, caps)) =
        lines.iter().enumerate().find_map(|(idx, line)| ARGS_BLOCK.captures(line).map(|c| (idx, c)))
    else {
        return BTreeMap::new();
    };

    let entries = inline_entries(&caps[2]).unwrap_or_else(|| block_entries(lines, idx, caps[1].len()));
    entries.into_iter().map(|(key, value)| (key, default_value(&value))).collect()
}

fn context_name(raw: &str) -> String {
    let name = sanitize_context_name(raw);
    match name.as_str() {
        "null" | "~" => DEFAULT_CONTEXT_NAME.to_string(),
        _ => name,
    }
}

fn extract_contexts(lines: &[String]) -> BTreeSet<String> {
    let mut contexts = BTreeSet::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = CONTEXT_KEY.captures(line) else {
            continue;
        };
        let key_indent = caps[1].len();
        let remainder = strip_comment(&caps[2]);

        let name = if remainder.starts_with('{') {
            inline_entries(remainder)
                .unwrap_or_default()
                .into_iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("name"))
                .map_or_else(|| DEFAULT_CONTEXT_NAME.to_string(), |(_, value)| context_name(&value))
        } else if remainder.is_empty() {
            nested_name(lines, idx, key_indent)
        } else {
            context_name(remainder)
        };
        contexts.insert(name);
    }

    contexts
}

/// Look for a `name:` key in the lines nested under a bare `context:` line.
fn nested_name(lines: &[String], idx: usize, key_indent: usize) -> String {
    for line in &lines[idx + 1..] {
        if is_skippable(line) {
            continue;
        }
        if indent_of(line) <= key_indent {
            break;
        }
        if let Some(caps) = NAME_KEY.captures(line) {
            return context_name(&caps[1]);
        }
    }
    DEFAULT_CONTEXT_NAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_targets_block_immediate_keys_only() {
        let text = "targets:\n  a:\n    image:\n      base: x\n  b: {}\n  \"nested/c\": {}\nname: after\n";
        let facts = extract(text);
        assert_eq!(names(&facts.targets), ["a", "b", "nested/c"]);
    }

    #[test]
    fn test_targets_block_stops_at_dedent_and_skips_comments() {
        let text = "spec:\n  targets:\n    # comment\n\n    one: {}\n  other:\n    two: {}\n";
        let facts = extract(text);
        assert_eq!(names(&facts.targets), ["one"]);
    }

    #[test]
    fn test_only_first_targets_block_counts() {
        let text = "targets:\n  a: {}\nlater:\n  targets:\n    z: {}\n";
        assert_eq!(names(&extract(text).targets), ["a"]);
    }

    #[test]
    fn test_tabs_count_as_two_spaces() {
        let text = "targets:\n\ta: {}\n\tb: {}\n";
        assert_eq!(names(&extract(text).targets), ["a", "b"]);
    }

    #[test]
    fn test_inline_targets() {
        let text = "targets: { a: {}, b: { image: { base: x } } }\n";
        assert_eq!(names(&extract(text).targets), ["a", "b"]);
    }

    #[test]
    fn test_contexts() {
        let text = "\
sources:
  src:
    context: {}
  vendor:
    context: {name: vendor}
  more:
    - context:
        name: \"extra\" # comment
      path: x
  bare:
    context:
    path: y
  nulls:
    context: ~
  Upper:
    CONTEXT: {name: 'up'},
";
        let facts = extract(text);
        assert_eq!(names(&facts.contexts), ["context", "extra", "up", "vendor"]);
    }

    #[test]
    fn test_args_block() {
        let text = "args:\n  FOO: bar # default\n  BAZ:\n  QUOTED: \"a b\"\n  NULLED: null\nname: x\n";
        let facts = extract(text);
        assert_eq!(facts.args.get("FOO"), Some(&Some("bar".to_string())));
        assert_eq!(facts.args.get("BAZ"), Some(&None));
        assert_eq!(facts.args.get("QUOTED"), Some(&Some("a b".to_string())));
        assert_eq!(facts.args.get("NULLED"), Some(&None));
        assert_eq!(facts.args.len(), 4);
    }

    #[test]
    fn test_inline_args() {
        let facts = extract("args: { FOO: bar, BAZ: }\n");
        assert_eq!(facts.args.get("FOO"), Some(&Some("bar".to_string())));
        assert_eq!(facts.args.get("BAZ"), Some(&None));
    }

    #[test]
    fn test_strip_comment_keeps_hash_inside_values() {
        assert_eq!(strip_comment("a#b # c"), "a#b");
        assert_eq!(strip_comment("# only"), "");
    }
}

//! Fact extraction from a parsed YAML tree.

use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};

use super::{SpecFacts, sanitize_context_name};
use crate::constants::DEFAULT_CONTEXT_NAME;

/// Parse `text` and walk the resulting tree.
///
/// # Errors
///
/// Returns an error when the text is not valid YAML.
pub fn extract(text: &str) -> Result<SpecFacts> {
    let root: Value = serde_yaml::from_str(text).context("Failed to parse spec as YAML")?;
    Ok(facts_from_value(&root))
}

/// Extract facts from an already parsed document.
pub fn facts_from_value(root: &Value) -> SpecFacts {
    let mut contexts = BTreeSet::new();
    collect_contexts(root, &mut contexts);

    SpecFacts {
        targets: extract_targets(root),
        contexts,
        args: extract_args(root),
    }
}

fn top_level_mapping<'a>(root: &'a Value, key: &str) -> Option<&'a Mapping> {
    root.as_mapping()?.get(key).and_then(untag).and_then(Value::as_mapping)
}

fn untag(value: &Value) -> Option<&Value> {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => Some(other),
    }
}

/// Render a scalar the way it would be passed on a command line.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => {
            serde_yaml::to_string(value).ok().map(|s| s.trim().to_string())
        }
    }
}

fn extract_targets(root: &Value) -> BTreeSet<String> {
    top_level_mapping(root, "targets")
        .map(|targets| targets.keys().filter_map(scalar_to_string).collect())
        .unwrap_or_default()
}

fn extract_args(root: &Value) -> BTreeMap<String, Option<String>> {
    top_level_mapping(root, "args")
        .map(|args| {
            args.iter()
                .filter_map(|(key, value)| Some((scalar_to_string(key)?, scalar_to_string(value))))
                .collect()
        })
        .unwrap_or_default()
}

fn context_name(value: &Value) -> String {
    match value {
        Value::String(s) => sanitize_context_name(s),
        Value::Mapping(m) => match m.get("name").and_then(untag) {
            Some(Value::String(name)) => sanitize_context_name(name),
            _ => DEFAULT_CONTEXT_NAME.to_string(),
        },
        Value::Tagged(tagged) => context_name(&tagged.value),
        _ => DEFAULT_CONTEXT_NAME.to_string(),
    }
}

fn collect_contexts(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                if key.as_str() == Some("context") {
                    out.insert(context_name(child));
                }
                collect_contexts(child, out);
            }
        }
        Value::Sequence(items) => items.iter().for_each(|item| collect_contexts(item, out)),
        Value::Tagged(tagged) => collect_contexts(&tagged.value, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_must_be_mapping() {
        let facts = extract("targets:\n  - a\n  - b\n").unwrap();
        assert!(facts.targets.is_empty());

        let facts = extract("targets: nope\n").unwrap();
        assert!(facts.targets.is_empty());
    }

    #[test]
    fn test_nested_targets_key_is_ignored() {
        let facts = extract("spec:\n  targets:\n    a: {}\n").unwrap();
        assert!(facts.targets.is_empty());
    }

    #[test]
    fn test_context_resolution_rules() {
        let text = r#"
sources:
  a:
    context:
  b:
    context: "named # comment"
  c:
    context:
      name: 42
  d:
    build:
      source:
        context: {name: deep}
  e:
    - context: {}
"#;
        let facts = extract(text).unwrap();
        let names: Vec<_> = facts.contexts.iter().map(String::as_str).collect();
        assert_eq!(names, ["context", "deep", "named"]);
    }

    #[test]
    fn test_args_values_are_stringified() {
        let facts = extract("args:\n  A: 1\n  B: true\n  C: ~\n  D: text\n").unwrap();
        assert_eq!(facts.args.get("A"), Some(&Some("1".to_string())));
        assert_eq!(facts.args.get("B"), Some(&Some("true".to_string())));
        assert_eq!(facts.args.get("C"), Some(&None));
        assert_eq!(facts.args.get("D"), Some(&Some("text".to_string())));
    }

    #[test]
    fn test_inline_args_mapping() {
        let facts = extract("args: { FOO: bar, BAZ: }\n").unwrap();
        assert_eq!(facts.args.len(), 2);
        assert_eq!(facts.args.get("FOO"), Some(&Some("bar".to_string())));
        assert_eq!(facts.args.get("BAZ"), Some(&None));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(extract("a: [\n").is_err());
    }
}

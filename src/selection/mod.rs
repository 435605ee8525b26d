//! Interactive collection of build inputs.
//!
//! Before a build or debug session the user chooses a target, a location for every build
//! context the spec references and a value for every build argument. Previous answers are
//! offered as pre-filled values, and a previous selection is reused without prompting when
//! it still covers what the spec declares:
//!
//! - a [`ContextSelection`] covers a spec when every declared context name is either
//!   `context` or one of its named contexts (extra names are fine)
//! - an [`ArgsSelection`] covers a spec when it has exactly the declared argument names
//!
//! Reused values are not revalidated; a context directory that has since been deleted is
//! passed to buildx as is.
//!
//! Dismissing any prompt cancels the whole selection. Collectors return `Ok(None)` in that
//! case and never hand back partial results.

pub mod context;
pub mod targets;

pub use context::{EmptyContextDir, is_remote_context, resolve_context_value};
pub use targets::{TargetGroup, group_targets, is_debug_target, pick_target};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::constants::{DEFAULT_CONTEXT_NAME, DEFAULT_CONTEXT_PROMPT_VALUE};
use crate::host::{InputRequest, UserPrompts};
use crate::spec::SpecFacts;

/// Where each build context comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSelection {
    /// The positional build context: an absolute path or a remote reference.
    pub default_context_path: String,
    /// Named contexts passed with `--build-context`.
    pub additional_contexts: BTreeMap<String, String>,
}

impl ContextSelection {
    /// Value chosen for `name`; `context` is the default context.
    pub fn value_for(&self, name: &str) -> Option<&str> {
        if name == DEFAULT_CONTEXT_NAME {
            Some(self.default_context_path.as_str())
        } else {
            self.additional_contexts.get(name).map(String::as_str)
        }
    }

    /// Whether every name in `declared` has a value.
    pub fn satisfies(&self, declared: &BTreeSet<String>) -> bool {
        declared
            .iter()
            .all(|name| name == DEFAULT_CONTEXT_NAME || self.additional_contexts.contains_key(name))
    }
}

/// Value of each build argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgsSelection {
    /// Argument name to value.
    pub values: BTreeMap<String, String>,
}

impl ArgsSelection {
    /// Whether the selection has exactly the declared argument names.
    pub fn satisfies(&self, declared: &BTreeMap<String, Option<String>>) -> bool {
        self.values.len() == declared.len() && declared.keys().all(|name| self.values.contains_key(name))
    }
}

fn context_prompt(name: &str) -> String {
    if name == DEFAULT_CONTEXT_NAME {
        "Build context for the spec (path or remote reference)".to_string()
    } else {
        format!("Build context '{name}' (path or remote reference)")
    }
}

/// Prompt for every context the spec references.
///
/// A spec without context references gets the shared empty directory from
/// `empty_context` and no named contexts, without prompting.
///
/// # Errors
///
/// Returns prompt failures, or an error if the empty directory cannot be created.
pub async fn collect_contexts<P: UserPrompts>(
    prompts: &P,
    facts: &SpecFacts,
    workspace_root: &Path,
    previous: Option<&ContextSelection>,
    empty_context: &mut EmptyContextDir,
) -> Result<Option<ContextSelection>> {
    if facts.contexts.is_empty() {
        return Ok(Some(ContextSelection {
            default_context_path: empty_context.path()?.display().to_string(),
            additional_contexts: BTreeMap::new(),
        }));
    }

    let mut names: BTreeSet<&str> = facts.contexts.iter().map(String::as_str).collect();
    names.insert(DEFAULT_CONTEXT_NAME);

    let mut selection = ContextSelection::default();
    for name in names {
        let prefill = previous
            .and_then(|prev| prev.value_for(name))
            .unwrap_or(DEFAULT_CONTEXT_PROMPT_VALUE);
        let request = InputRequest::new(context_prompt(name))
            .with_value(prefill)
            .with_placeholder(DEFAULT_CONTEXT_PROMPT_VALUE);

        let Some(answer) = prompts.input_box(&request).await? else {
            tracing::debug!("Context selection cancelled at '{name}'");
            return Ok(None);
        };
        let resolved = resolve_context_value(&answer, workspace_root)?;

        if name == DEFAULT_CONTEXT_NAME {
            selection.default_context_path = resolved;
        } else {
            selection.additional_contexts.insert(name.to_string(), resolved);
        }
    }

    Ok(Some(selection))
}

/// Prompt for every declared build argument.
///
/// # Errors
///
/// Returns prompt failures.
pub async fn collect_args<P: UserPrompts>(
    prompts: &P,
    facts: &SpecFacts,
    previous: Option<&ArgsSelection>,
) -> Result<Option<ArgsSelection>> {
    let mut selection = ArgsSelection::default();

    for (name, default) in &facts.args {
        let prefill = previous
            .and_then(|prev| prev.values.get(name))
            .or(default.as_ref())
            .cloned()
            .unwrap_or_default();
        let mut request = InputRequest::new(format!("Value for build argument '{name}'")).with_value(prefill);
        if let Some(default) = default {
            request = request.with_placeholder(format!("default: {default}"));
        }

        let Some(answer) = prompts.input_box(&request).await? else {
            tracing::debug!("Argument selection cancelled at '{name}'");
            return Ok(None);
        };
        selection.values.insert(name.clone(), answer);
    }

    Ok(Some(selection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{AskedPrompt, ScriptedAnswer, ScriptedPrompts};

    fn facts(contexts: &[&str], args: &[(&str, Option<&str>)]) -> SpecFacts {
        SpecFacts {
            targets: BTreeSet::new(),
            contexts: contexts.iter().map(ToString::to_string).collect(),
            args: args
                .iter()
                .map(|(name, default)| (name.to_string(), default.map(ToString::to_string)))
                .collect(),
        }
    }

    fn names(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_context_reuse_rule() {
        let cached = ContextSelection {
            default_context_path: "/ws".to_string(),
            additional_contexts: [("vendor".to_string(), "/ws/vendor".to_string())].into(),
        };
        assert!(cached.satisfies(&names(&["context"])));
        assert!(cached.satisfies(&names(&["context", "vendor"])));
        assert!(cached.satisfies(&BTreeSet::new()));
        assert!(!cached.satisfies(&names(&["context", "vendor", "extra"])));
    }

    #[test]
    fn test_args_reuse_rule() {
        let cached = ArgsSelection {
            values: [("FOO".to_string(), "bar".to_string())].into(),
        };
        assert!(cached.satisfies(&facts(&[], &[("FOO", None)]).args));
        assert!(!cached.satisfies(&facts(&[], &[("FOO", None), ("BAR", None)]).args));
        assert!(!cached.satisfies(&BTreeMap::new()));
        assert!(ArgsSelection::default().satisfies(&BTreeMap::new()));
    }

    #[tokio::test]
    async fn test_no_contexts_uses_empty_dir() {
        let prompts = ScriptedPrompts::default();
        let mut empty = EmptyContextDir::default();
        let selection = collect_contexts(&prompts, &facts(&[], &[]), Path::new("/ws"), None, &mut empty)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(selection.default_context_path, empty.path().unwrap().display().to_string());
        assert!(selection.additional_contexts.is_empty());
        assert!(prompts.asked().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_contexts_prompted_in_order_with_prefill() {
        let prompts = ScriptedPrompts::new([
            ScriptedAnswer::Input("type=git,ref=main".to_string()),
            ScriptedAnswer::Accept,
            ScriptedAnswer::Input("vendor".to_string()),
        ]);
        let previous = ContextSelection {
            default_context_path: "/old/root".to_string(),
            additional_contexts: BTreeMap::new(),
        };
        let mut empty = EmptyContextDir::default();
        let selection = collect_contexts(
            &prompts,
            &facts(&["vendor", "context", "alpha"], &[]),
            Path::new("/ws"),
            Some(&previous),
            &mut empty,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(selection.additional_contexts.get("alpha").unwrap(), "type=git,ref=main");
        assert_eq!(selection.default_context_path, "/old/root");
        assert_eq!(
            selection.additional_contexts.get("vendor").unwrap(),
            &Path::new("/ws").join("vendor").display().to_string()
        );

        let asked = prompts.asked();
        let prefills: Vec<_> = asked
            .iter()
            .map(|prompt| match prompt {
                AskedPrompt::Input(request) => request.value.clone().unwrap(),
                AskedPrompt::Pick { .. } => panic!("unexpected pick"),
            })
            .collect();
        assert_eq!(prefills, [".", "/old/root", "."]);
    }

    #[tokio::test]
    async fn test_cancel_discards_partial_contexts() {
        let prompts = ScriptedPrompts::new([ScriptedAnswer::Input("a".to_string()), ScriptedAnswer::Cancel]);
        let mut empty = EmptyContextDir::default();
        let result =
            collect_contexts(&prompts, &facts(&["context", "vendor"], &[]), Path::new("/ws"), None, &mut empty)
                .await
                .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_args_prefill_order() {
        let prompts = ScriptedPrompts::new([
            ScriptedAnswer::Accept,
            ScriptedAnswer::Accept,
            ScriptedAnswer::Accept,
        ]);
        let previous = ArgsSelection {
            values: [("A".to_string(), "previous".to_string())].into(),
        };
        let selection = collect_args(
            &prompts,
            &facts(&[], &[("A", Some("declared")), ("B", Some("declared")), ("C", None)]),
            Some(&previous),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(selection.values.get("A").unwrap(), "previous");
        assert_eq!(selection.values.get("B").unwrap(), "declared");
        assert_eq!(selection.values.get("C").unwrap(), "");

        match &prompts.asked()[1] {
            AskedPrompt::Input(request) => {
                assert_eq!(request.placeholder.as_deref(), Some("default: declared"));
            }
            other => panic!("unexpected prompt {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_args_means_no_prompts() {
        let prompts = ScriptedPrompts::default();
        let selection = collect_args(&prompts, &facts(&[], &[]), None).await.unwrap().unwrap();
        assert!(selection.values.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_args() {
        let prompts = ScriptedPrompts::new([ScriptedAnswer::Cancel]);
        let result = collect_args(&prompts, &facts(&[], &[("A", None)]), None).await.unwrap();
        assert_eq!(result, None);
    }
}

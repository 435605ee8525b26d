//! Target picking.
//!
//! Dalec target names are hierarchical (`azlinux3/container`, `jammy/testing/container`).
//! The picker groups them by their first segment so a long list stays navigable, and pushes
//! debug helpers (`debug/resolve`, `azlinux3/debug`, ...) to the end of every list.

use anyhow::Result;
use std::cmp::Ordering;

use crate::host::{InputRequest, PickItem, UserPrompts};
use crate::targets::BuildTargetInfo;

const DEBUG_SEGMENT: &str = "debug";

/// Targets sharing a first path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroup {
    /// First segment of every member's name.
    pub scope: String,
    /// Members, in display order.
    pub targets: Vec<BuildTargetInfo>,
}

fn scope_of(name: &str) -> &str {
    name.split('/').next().unwrap_or(name)
}

fn remainder_of(name: &str) -> &str {
    name.split_once('/').map_or("", |(_, rest)| rest)
}

/// Whether `name` is a debug helper rather than a real build target.
///
/// True for `debug` itself, `debug/...`, `debug-...`, `.../debug`, `...-debug`, and any
/// name with a `debug` path segment. Case-insensitive.
pub fn is_debug_target(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == DEBUG_SEGMENT
        || lower.starts_with("debug/")
        || lower.starts_with("debug-")
        || lower.ends_with("/debug")
        || lower.ends_with("-debug")
        || lower.split('/').any(|segment| segment == DEBUG_SEGMENT)
}

fn is_debug_scope(scope: &str) -> bool {
    scope.eq_ignore_ascii_case(DEBUG_SEGMENT)
}

fn compare_scopes(a: &str, b: &str) -> Ordering {
    is_debug_scope(a).cmp(&is_debug_scope(b)).then_with(|| a.cmp(b))
}

fn compare_members(a: &BuildTargetInfo, b: &BuildTargetInfo) -> Ordering {
    is_debug_target(&a.name)
        .cmp(&is_debug_target(&b.name))
        .then_with(|| remainder_of(&a.name).cmp(remainder_of(&b.name)))
        .then_with(|| a.name.cmp(&b.name))
}

/// Group by first segment. Scopes are alphabetical with `debug` last; members are sorted
/// by the rest of their name with debug targets last.
pub fn group_targets(targets: &[BuildTargetInfo]) -> Vec<TargetGroup> {
    let mut groups: Vec<TargetGroup> = Vec::new();
    for target in targets {
        let scope = scope_of(&target.name);
        match groups.iter_mut().find(|group| group.scope == scope) {
            Some(group) => group.targets.push(target.clone()),
            None => groups.push(TargetGroup {
                scope: scope.to_string(),
                targets: vec![target.clone()],
            }),
        }
    }

    groups.sort_by(|a, b| compare_scopes(&a.scope, &b.scope));
    for group in &mut groups {
        group.targets.sort_by(compare_members);
    }
    groups
}

fn target_item(target: &BuildTargetInfo) -> PickItem {
    let item = PickItem::new(target.name.clone());
    match (&target.description, target.is_default) {
        (Some(description), true) => item.with_description(format!("{description} (default)")),
        (Some(description), false) => item.with_description(description.clone()),
        (None, true) => item.with_description("(default)"),
        (None, false) => item,
    }
}

fn scope_item(group: &TargetGroup) -> PickItem {
    match group.targets.as_slice() {
        [single] => target_item(single),
        members => PickItem::new(group.scope.clone())
            .with_description(format!("{} targets", members.len())),
    }
}

/// Ask the user for a target. `Ok(None)` means the user cancelled.
///
/// - no targets: free-text input, an empty answer cancels
/// - one target: chosen without asking
/// - several: pick a scope, then a target in it; a single scope skips the first step and
///   a scope with a single member is chosen directly
pub async fn pick_target<P: UserPrompts>(
    prompts: &P,
    targets: &[BuildTargetInfo],
    title: &str,
) -> Result<Option<String>> {
    match targets {
        [] => {
            let request = InputRequest::new("No targets detected in this spec. Enter a target name to use.")
                .with_placeholder("target-name");
            let answer = prompts.input_box(&request).await?;
            Ok(answer.map(|name| name.trim().to_string()).filter(|name| !name.is_empty()))
        }
        [only] => Ok(Some(only.name.clone())),
        _ => {
            let groups = group_targets(targets);
            let group = if let [group] = groups.as_slice() {
                group
            } else {
                let items: Vec<PickItem> = groups.iter().map(scope_item).collect();
                let Some(index) = prompts.quick_pick(title, &items).await? else {
                    return Ok(None);
                };
                let Some(group) = groups.get(index) else {
                    return Ok(None);
                };
                if let [single] = group.targets.as_slice() {
                    return Ok(Some(single.name.clone()));
                }
                group
            };

            let items: Vec<PickItem> = group.targets.iter().map(target_item).collect();
            let scoped_title = format!("{title} ({})", group.scope);
            let Some(index) = prompts.quick_pick(&scoped_title, &items).await? else {
                return Ok(None);
            };
            Ok(group.targets.get(index).map(|target| target.name.clone()))
        }
    }
}

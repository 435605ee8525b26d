//! Build target discovery.
//!
//! Targets come from two places: the `targets` keys declared in the spec, and whatever the
//! Dalec frontend reports when asked with `docker buildx build --call targets`. The frontend
//! knows about targets the spec does not spell out (for example `azlinux3/container`) and
//! supplies descriptions, so its answer wins for names present in both.
//!
//! Frontend queries are slow, so results are cached per document for a fixed window. A
//! failed query never fails the caller: it shows a warning and falls back to the last good
//! result, or to the static targets alone.

mod parse;

pub use parse::parse_targets_output;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;

use crate::config::AssistConfig;
use crate::constants::{BUILDX_EXPERIMENTAL_ENV, MAX_PROCESS_OUTPUT_BYTES};
use crate::host::{OutputSink, ProcessRequest, ProcessRunner};
use crate::tracker::TrackedDocument;
use crate::utils::spinner_with_message;

/// A target the user can build or debug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildTargetInfo {
    /// Target name, segments separated by `/`.
    pub name: String,
    /// Human readable description reported by the frontend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The frontend's default target.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,
}

impl BuildTargetInfo {
    /// A statically declared target.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            is_default: false,
        }
    }
}

#[derive(Debug, Clone)]
struct FrontendTargetCacheEntry {
    targets: Vec<BuildTargetInfo>,
    fetched_at: DateTime<Utc>,
}

/// Merge static names with frontend results; frontend entries replace static ones.
/// The result is sorted by name.
pub fn merge_targets(
    declared: &BTreeSet<String>,
    discovered: Option<Vec<BuildTargetInfo>>,
) -> Vec<BuildTargetInfo> {
    let mut merged: BTreeMap<String, BuildTargetInfo> = declared
        .iter()
        .map(|name| (name.clone(), BuildTargetInfo::named(name.clone())))
        .collect();
    for target in discovered.into_iter().flatten() {
        merged.insert(target.name.clone(), target);
    }
    merged.into_values().collect()
}

/// Queries the frontend for targets and caches the answers.
pub struct TargetResolver {
    cache: HashMap<String, FrontendTargetCacheEntry>,
    ttl: Duration,
    program: String,
    prefix_args: Vec<String>,
    env: BTreeMap<String, String>,
    show_progress: bool,
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new(&AssistConfig::default())
    }
}

impl TargetResolver {
    /// Resolver using the buildx command and cache window from `config`.
    pub fn new(config: &AssistConfig) -> Self {
        Self {
            cache: HashMap::new(),
            ttl: config.target_cache_ttl(),
            program: config.buildx_program().to_string(),
            prefix_args: config.buildx_prefix_args().to_vec(),
            env: config.buildx.env.clone(),
            show_progress: false,
        }
    }

    /// Show a spinner while querying.
    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Override the cache window.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The subprocess used to list targets of `spec_path` with `context_dir` as build context.
    pub fn query_request(&self, spec_path: &Path, context_dir: &Path) -> ProcessRequest {
        let mut args = self.prefix_args.clone();
        args.extend([
            "build".to_string(),
            "--call".to_string(),
            "targets,format=json".to_string(),
            "-f".to_string(),
            spec_path.display().to_string(),
            context_dir.display().to_string(),
        ]);

        let mut env = self.env.clone();
        env.insert(BUILDX_EXPERIMENTAL_ENV.to_string(), "1".to_string());

        ProcessRequest {
            program: self.program.clone(),
            args,
            cwd: Some(context_dir.to_path_buf()),
            env,
            max_output: MAX_PROCESS_OUTPUT_BYTES,
        }
    }

    /// Merged static and frontend targets for a tracked document. Never fails.
    pub async fn resolve<R, O>(
        &mut self,
        document: &TrackedDocument,
        context_dir: &Path,
        runner: &R,
        output: &O,
    ) -> Vec<BuildTargetInfo>
    where
        R: ProcessRunner,
        O: OutputSink,
    {
        let discovered =
            self.frontend_targets(&document.key, &document.path, context_dir, runner, output).await;
        merge_targets(&document.facts.targets, discovered)
    }

    /// Targets reported by the frontend, from cache while fresh.
    ///
    /// Returns the last good result (even if stale) when the query fails, `None` when there
    /// is nothing to fall back to.
    pub async fn frontend_targets<R, O>(
        &mut self,
        key: &str,
        spec_path: &Path,
        context_dir: &Path,
        runner: &R,
        output: &O,
    ) -> Option<Vec<BuildTargetInfo>>
    where
        R: ProcessRunner,
        O: OutputSink,
    {
        let cached = self.cache.get(key).cloned();
        if let Some(entry) = cached.as_ref().filter(|entry| self.is_fresh(entry)) {
            tracing::debug!(target: "targets", "Using cached targets for {key}");
            return Some(entry.targets.clone());
        }

        let request = self.query_request(spec_path, context_dir);
        let spinner =
            spinner_with_message(self.show_progress, "Querying Dalec targets via docker buildx...");
        let result = runner.run(&request).await;
        spinner.finish_and_clear();

        let failure = match result {
            Ok(out) if out.success => {
                let parsed = parse_targets_output(&out.stdout);
                tracing::debug!(target: "targets", "Frontend reported {} targets for {key}", parsed.len());
                if !parsed.is_empty() {
                    self.cache.insert(
                        key.to_string(),
                        FrontendTargetCacheEntry {
                            targets: parsed.clone(),
                            fetched_at: Utc::now(),
                        },
                    );
                }
                return Some(parsed);
            }
            Ok(out) => {
                let detail = if out.stderr.trim().is_empty() { out.stdout } else { out.stderr };
                match out.code {
                    Some(code) => format!("exit code {code}: {}", detail.trim()),
                    None => format!("terminated: {}", detail.trim()),
                }
            }
            Err(err) => format!("{err:#}"),
        };

        tracing::debug!(target: "targets", "Target query failed for {key}: {failure}");
        output.warning(&format!("Failed to query Dalec targets: {failure}"));
        cached.map(|entry| entry.targets)
    }

    /// Drop the cached frontend answer for `key`.
    pub fn invalidate(&mut self, key: &str) {
        self.cache.remove(key);
    }

    fn is_fresh(&self, entry: &FrontendTargetCacheEntry) -> bool {
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        Utc::now().signed_duration_since(entry.fetched_at) < ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ProcessOutput;
    use crate::spec::SpecFacts;
    use crate::test_utils::{FakeProcessRunner, RecordingOutput};
    use std::path::PathBuf;

    fn document(targets: &[&str]) -> TrackedDocument {
        TrackedDocument {
            key: "file:///ws/dalec.yml".to_string(),
            path: PathBuf::from("/ws/dalec.yml"),
            version: 1,
            facts: SpecFacts {
                targets: targets.iter().map(ToString::to_string).collect(),
                ..SpecFacts::default()
            },
            text: String::new(),
        }
    }

    fn ok(stdout: &str) -> ProcessOutput {
        ProcessOutput {
            code: Some(0),
            success: true,
            stdout: stdout.to_string(),
            ..ProcessOutput::default()
        }
    }

    fn failed(stderr: &str) -> ProcessOutput {
        ProcessOutput {
            code: Some(1),
            success: false,
            stderr: stderr.to_string(),
            ..ProcessOutput::default()
        }
    }

    #[test]
    fn test_merge_prefers_discovered_entries() {
        let declared: BTreeSet<String> = ["b", "a"].iter().map(ToString::to_string).collect();
        let discovered = vec![
            BuildTargetInfo {
                name: "b".to_string(),
                description: Some("from frontend".to_string()),
                is_default: false,
            },
            BuildTargetInfo::named("c"),
        ];
        let merged = merge_targets(&declared, Some(discovered));
        let names: Vec<_> = merged.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(merged[1].description.as_deref(), Some("from frontend"));

        assert_eq!(merge_targets(&declared, None).len(), 2);
    }

    #[test]
    fn test_query_request_shape() {
        let resolver = TargetResolver::default();
        let request = resolver.query_request(Path::new("/ws/dalec.yml"), Path::new("/ws"));
        assert_eq!(request.program, "docker");
        assert_eq!(
            request.args,
            ["buildx", "build", "--call", "targets,format=json", "-f", "/ws/dalec.yml", "/ws"]
        );
        assert_eq!(request.cwd.as_deref(), Some(Path::new("/ws")));
        assert_eq!(request.env.get("BUILDX_EXPERIMENTAL").map(String::as_str), Some("1"));
        assert_eq!(request.max_output, 20 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_results_are_cached() {
        let runner = FakeProcessRunner::new();
        runner.push_output(ok(r#"{"targets":[{"name":"azlinux3"}]}"#));
        let output = RecordingOutput::default();
        let mut resolver = TargetResolver::default();
        let doc = document(&["jammy"]);

        let first = resolver.resolve(&doc, Path::new("/ws"), &runner, &output).await;
        let second = resolver.resolve(&doc, Path::new("/ws"), &runner, &output).await;
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(runner.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_stale_cache() {
        let runner = FakeProcessRunner::new();
        runner.push_output(ok(r#"{"targets":[{"name":"azlinux3"}]}"#));
        runner.push_output(failed("frontend exploded"));
        let output = RecordingOutput::default();
        let mut resolver = TargetResolver::default().with_ttl(Duration::ZERO);
        let doc = document(&[]);

        resolver.resolve(&doc, Path::new("/ws"), &runner, &output).await;
        let fallback = resolver.resolve(&doc, Path::new("/ws"), &runner, &output).await;

        assert_eq!(runner.requests().len(), 2);
        assert_eq!(fallback, vec![BuildTargetInfo::named("azlinux3")]);
        let warnings = output.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Failed to query Dalec targets"));
        assert!(warnings[0].contains("frontend exploded"));
    }

    #[tokio::test]
    async fn test_failure_without_cache_uses_static_targets() {
        let runner = FakeProcessRunner::new();
        runner.push_error("docker: command not found");
        let output = RecordingOutput::default();
        let mut resolver = TargetResolver::default();

        let targets = resolver.resolve(&document(&["a"]), Path::new("/ws"), &runner, &output).await;
        assert_eq!(targets, vec![BuildTargetInfo::named("a")]);
        assert_eq!(output.warnings().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_results_are_not_cached() {
        let runner = FakeProcessRunner::new();
        runner.push_output(ok(""));
        runner.push_output(ok("foo\n"));
        let output = RecordingOutput::default();
        let mut resolver = TargetResolver::default();
        let doc = document(&[]);

        assert!(resolver.resolve(&doc, Path::new("/ws"), &runner, &output).await.is_empty());
        let second = resolver.resolve(&doc, Path::new("/ws"), &runner, &output).await;
        assert_eq!(second, vec![BuildTargetInfo::named("foo")]);
        assert!(output.warnings().is_empty());
    }
}

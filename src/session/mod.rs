//! The coordinator behind "build current spec", "debug current spec" and "repeat last
//! action".
//!
//! A [`Session`] owns every piece of state that lives as long as the host process: the
//! document tracker, the frontend target cache, the per-document selection caches, the
//! empty build-context directory and the last action. Nothing is persisted.
//!
//! # Flow
//!
//! ```text
//! resolve document ──► resolve targets ──► pick target ──► contexts ──► args
//!                                                                      │
//!           build: assemble argv, send to terminal  ◄──────────────────┤
//!           debug: launch configuration + adapter descriptor ◄─────────┘
//! ```
//!
//! Selections are cached per document and reused without prompting while they still
//! cover what the document declares. Every tracker transition of a document drops its
//! cached selections; the last action keeps its copy so later prompts can be pre-filled.
//!
//! Cancelling any prompt ends the action with `Ok(None)` and leaves every cache as it was.

use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::command::{BuildInputs, BuildMode, BuildxInvocation, CommandAssembler, terminal_command};
use crate::config::AssistConfig;
use crate::constants::BUILDX_EXPERIMENTAL_ENV;
use crate::core::DalecError;
use crate::debug::{
    DebugConfiguration, LaunchDescriptor, LaunchRequest, adapter_descriptor, resolve_debug_configuration,
    resolve_with_substituted_variables,
};
use crate::host::{OutputSink, ProcessRunner, UserPrompts};
use crate::selection::{ArgsSelection, ContextSelection, EmptyContextDir, collect_args, collect_contexts, pick_target};
use crate::spec::FactStrategy;
use crate::targets::{BuildTargetInfo, TargetResolver};
use crate::tracker::{DocumentTracker, TextDocument, TrackedDocument, TrackerEvent, TrackerEventKind};

/// Actions offered on a tracked document, in display order.
pub const DOCUMENT_ACTIONS: [&str; 2] = ["Dalec: Debug", "Dalec: Build"];

/// Build or debug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Build,
    Debug,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Debug => write!(f, "debug"),
        }
    }
}

/// The most recent successful action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastAction {
    pub kind: ActionKind,
    pub target: String,
    pub spec_key: String,
    pub spec_path: PathBuf,
    pub contexts: ContextSelection,
    pub args: ArgsSelection,
}

/// Parameters of a build or debug request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRequest {
    /// Spec to act on; the active document when `None`.
    pub spec: Option<PathBuf>,
    /// Skip the target picker.
    pub target: Option<String>,
    /// Add `--no-cache` on top of the configured default.
    pub no_cache: bool,
}

impl ActionRequest {
    /// Request for the spec at `path`.
    pub fn for_spec(path: impl Into<PathBuf>) -> Self {
        Self {
            spec: Some(path.into()),
            ..Self::default()
        }
    }

    /// Preselect the target.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// A debug session ready to start.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugLaunch {
    pub configuration: DebugConfiguration,
    pub launch: LaunchRequest,
    pub descriptor: LaunchDescriptor,
}

/// What a finished action produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The build command that was sent to the terminal.
    Built(BuildxInvocation),
    /// The debug session to start.
    Debug(Box<DebugLaunch>),
}

/// Nearest ancestor of `spec` holding a `.git` entry, else the spec's directory.
pub fn workspace_root_for(spec: &Path) -> PathBuf {
    let dir = spec.parent().unwrap_or(spec);
    dir.ancestors()
        .find(|candidate| candidate.join(".git").exists())
        .unwrap_or(dir)
        .to_path_buf()
}

/// Process-lifetime coordinator.
pub struct Session<P, R, O> {
    config: AssistConfig,
    tracker: DocumentTracker,
    events: broadcast::Receiver<TrackerEvent>,
    targets: TargetResolver,
    assembler: CommandAssembler,
    context_cache: HashMap<String, ContextSelection>,
    args_cache: HashMap<String, ArgsSelection>,
    empty_context: EmptyContextDir,
    last_action: Option<LastAction>,
    active: Option<String>,
    workspace: Option<PathBuf>,
    prompts: P,
    runner: R,
    output: O,
}

impl<P, R, O> Session<P, R, O>
where
    P: UserPrompts,
    R: ProcessRunner,
    O: OutputSink,
{
    /// New session with empty caches.
    pub fn new(config: AssistConfig, prompts: P, runner: R, output: O) -> Self {
        let tracker = DocumentTracker::new(FactStrategy::Auto);
        let events = tracker.subscribe();
        Self {
            targets: TargetResolver::new(&config),
            assembler: CommandAssembler::new(&config),
            config,
            tracker,
            events,
            context_cache: HashMap::new(),
            args_cache: HashMap::new(),
            empty_context: EmptyContextDir::default(),
            last_action: None,
            active: None,
            workspace: None,
            prompts,
            runner,
            output,
        }
    }

    /// Use `root` as workspace for every document instead of searching for `.git`.
    #[must_use]
    pub fn with_workspace(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace = Some(root.into());
        self
    }

    /// Show a spinner while querying the frontend.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.targets = self.targets.with_progress(show_progress);
        self
    }

    pub const fn tracker(&self) -> &DocumentTracker {
        &self.tracker
    }

    pub const fn output(&self) -> &O {
        &self.output
    }

    pub const fn prompts(&self) -> &P {
        &self.prompts
    }

    pub const fn last_action(&self) -> Option<&LastAction> {
        self.last_action.as_ref()
    }

    /// Key of the active document, if it is a tracked spec.
    pub fn active_document(&self) -> Option<&str> {
        self.active.as_deref().filter(|key| self.tracker.is_tracked(key))
    }

    /// Cached context selection for `key`.
    pub fn cached_contexts(&self, key: &str) -> Option<&ContextSelection> {
        self.context_cache.get(key)
    }

    /// A document was opened or focused; it becomes the active document.
    pub fn open_document(&mut self, document: &TextDocument) -> Option<TrackerEvent> {
        let event = self.tracker.open(document);
        self.active = Some(document.key.clone());
        self.drain_events();
        event
    }

    /// A document changed.
    pub fn change_document(&mut self, document: &TextDocument) -> Option<TrackerEvent> {
        let event = self.tracker.change(document);
        self.drain_events();
        event
    }

    /// A document was closed.
    pub fn close_document(&mut self, key: &str) -> Option<TrackerEvent> {
        let event = self.tracker.close(key);
        if self.active.as_deref() == Some(key) {
            self.active = None;
        }
        self.drain_events();
        event
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.invalidate(&event),
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::debug!("Missed {missed} tracker events, dropping all selections");
                    self.context_cache.clear();
                    self.args_cache.clear();
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    fn invalidate(&mut self, event: &TrackerEvent) {
        tracing::debug!(target: "tracker", "{:?} {}, dropping cached selections", event.kind, event.key);
        self.context_cache.remove(&event.key);
        self.args_cache.remove(&event.key);
        if event.kind == TrackerEventKind::Untracked {
            self.targets.invalidate(&event.key);
        }
    }

    /// Bring the tracker in line with the file at `path` and return its tracked snapshot.
    ///
    /// Unchanged text is not re-evaluated, so cached selections survive.
    async fn sync_from_disk(&mut self, path: &Path) -> Result<TrackedDocument> {
        let document = TextDocument::load(path).await?;
        let current = self.tracker.get(&document.key);
        match current {
            Some(tracked) if tracked.text == document.text => {
                self.active = Some(document.key.clone());
            }
            Some(tracked) => {
                let mut changed = document.clone();
                changed.version = tracked.version + 1;
                self.change_document(&changed);
                self.active = Some(document.key.clone());
            }
            None => {
                self.open_document(&document);
            }
        }

        self.tracker.get(&document.key).ok_or_else(|| {
            DalecError::NotASpecDocument {
                path: document.path.display().to_string(),
            }
            .into()
        })
    }

    async fn resolve_document(&mut self, spec: Option<&Path>) -> Result<TrackedDocument> {
        self.drain_events();
        match spec {
            Some(path) => self.sync_from_disk(path).await,
            None => self
                .active_document()
                .and_then(|key| self.tracker.get(key))
                .ok_or_else(|| DalecError::NoActiveDocument.into()),
        }
    }

    fn workspace_root(&self, spec: &Path) -> PathBuf {
        self.workspace.clone().unwrap_or_else(|| workspace_root_for(spec))
    }

    fn previous_for(&self, key: &str) -> Option<&LastAction> {
        self.last_action.as_ref().filter(|last| last.spec_key == key)
    }

    /// Reuse the cached selections when they still cover the document, otherwise prompt.
    async fn selections(
        &mut self,
        document: &TrackedDocument,
        root: &Path,
        stale: Option<(&ContextSelection, &ArgsSelection)>,
    ) -> Result<Option<(ContextSelection, ArgsSelection)>> {
        let facts = &document.facts;
        let cached_contexts = self.context_cache.get(&document.key).cloned();
        let contexts = match cached_contexts {
            Some(cached) if cached.satisfies(&facts.contexts) => cached,
            cached => {
                let previous = cached.or_else(|| stale.map(|(contexts, _)| contexts.clone()));
                let collected =
                    collect_contexts(&self.prompts, facts, root, previous.as_ref(), &mut self.empty_context).await?;
                let Some(collected) = collected else {
                    return Ok(None);
                };
                collected
            }
        };

        let cached_args = self.args_cache.get(&document.key).cloned();
        let args = match cached_args {
            Some(cached) if cached.satisfies(&facts.args) => cached,
            cached => {
                let previous = cached.or_else(|| stale.map(|(_, args)| args.clone()));
                let Some(collected) = collect_args(&self.prompts, facts, previous.as_ref()).await? else {
                    return Ok(None);
                };
                collected
            }
        };

        self.context_cache.insert(document.key.clone(), contexts.clone());
        self.args_cache.insert(document.key.clone(), args.clone());
        Ok(Some((contexts, args)))
    }

    async fn choose_target(&mut self, document: &TrackedDocument, root: &Path, title: &str) -> Result<Option<String>> {
        let targets = self.targets.resolve(document, root, &self.runner, &self.output).await;
        pick_target(&self.prompts, &targets, title).await
    }

    /// Declared and frontend targets of the spec at `path`, merged.
    ///
    /// # Errors
    ///
    /// Unreadable or unrecognized documents. Frontend failures only produce warnings.
    pub async fn list_targets(&mut self, path: &Path) -> Result<Vec<BuildTargetInfo>> {
        self.drain_events();
        let document = self.sync_from_disk(path).await?;
        let root = self.workspace_root(&document.path);
        Ok(self.targets.resolve(&document, &root, &self.runner, &self.output).await)
    }

    /// Prompt for whatever is missing and send the build command to a terminal.
    ///
    /// # Errors
    ///
    /// Missing or unrecognized documents, prompt failures and failed terminal commands.
    pub async fn build_current_spec(&mut self, request: &ActionRequest) -> Result<Option<ActionOutcome>> {
        self.run_action(ActionKind::Build, request).await
    }

    /// Prompt for whatever is missing and prepare a debug session.
    ///
    /// # Errors
    ///
    /// Missing or unrecognized documents, prompt failures and invalid launch values.
    pub async fn debug_current_spec(&mut self, request: &ActionRequest) -> Result<Option<ActionOutcome>> {
        self.run_action(ActionKind::Debug, request).await
    }

    async fn run_action(&mut self, kind: ActionKind, request: &ActionRequest) -> Result<Option<ActionOutcome>> {
        let document = self.resolve_document(request.spec.as_deref()).await?;
        let root = self.workspace_root(&document.path);

        let target = match &request.target {
            Some(target) => target.clone(),
            None => {
                let title = format!("Select a Dalec target to {kind}");
                let Some(target) = self.choose_target(&document, &root, &title).await? else {
                    tracing::debug!("Target selection cancelled");
                    return Ok(None);
                };
                target
            }
        };

        let stale = self.previous_for(&document.key).map(|last| (last.contexts.clone(), last.args.clone()));
        let stale_ref = stale.as_ref().map(|(contexts, args)| (contexts, args));
        let Some((contexts, args)) = self.selections(&document, &root, stale_ref).await? else {
            return Ok(None);
        };

        self.execute(kind, &document, &root, target, contexts, args, request.no_cache).await.map(Some)
    }

    /// Repeat the last action, optionally as the other kind.
    ///
    /// The target is kept. Selections are reused while they cover the document; otherwise
    /// the user is asked again with the previous answers pre-filled.
    ///
    /// # Errors
    ///
    /// No previous action, a spec that vanished or stopped being a Dalec spec, and every
    /// error of the action itself.
    pub async fn rerun_last_action(&mut self, kind: Option<ActionKind>) -> Result<Option<ActionOutcome>> {
        let Some(last) = self.last_action.clone() else {
            return Err(DalecError::Other {
                message: "No Dalec build or debug action to repeat".to_string(),
            }
            .into());
        };
        let kind = kind.unwrap_or(last.kind);
        self.drain_events();

        let document = match self.tracker.get(&last.spec_key) {
            Some(document) => document,
            None => self.sync_from_disk(&last.spec_path).await?,
        };
        let root = self.workspace_root(&document.path);

        let facts = &document.facts;
        let contexts = if last.contexts.satisfies(&facts.contexts) {
            last.contexts.clone()
        } else {
            let collected =
                collect_contexts(&self.prompts, facts, &root, Some(&last.contexts), &mut self.empty_context).await?;
            let Some(collected) = collected else {
                return Ok(None);
            };
            collected
        };
        let args = if last.args.satisfies(&facts.args) {
            last.args.clone()
        } else {
            let Some(collected) = collect_args(&self.prompts, facts, Some(&last.args)).await? else {
                return Ok(None);
            };
            collected
        };

        self.context_cache.insert(document.key.clone(), contexts.clone());
        self.args_cache.insert(document.key.clone(), args.clone());
        self.execute(kind, &document, &root, last.target, contexts, args, false).await.map(Some)
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &mut self,
        kind: ActionKind,
        document: &TrackedDocument,
        root: &Path,
        target: String,
        contexts: ContextSelection,
        args: ArgsSelection,
        no_cache: bool,
    ) -> Result<ActionOutcome> {
        let no_cache = no_cache || self.config.buildx.no_cache;
        let outcome = match kind {
            ActionKind::Build => {
                let inputs = BuildInputs::from_selections(&target, &document.path, &contexts, &args, no_cache);
                let invocation = self.assembler.assemble(BuildMode::Build, &inputs);
                let mut env = self.config.buildx.env.clone();
                env.insert(BUILDX_EXPERIMENTAL_ENV.to_string(), "1".to_string());
                let command =
                    terminal_command(&invocation, &self.config.shell(), &target, &document.path, root, env);
                tracing::info!("Building {target} from {}", document.path.display());
                self.output.send_to_terminal(&command).await?;
                ActionOutcome::Built(invocation)
            }
            ActionKind::Debug => {
                let launch = self.debug_launch(document, root, &target, &contexts, &args, no_cache).await?;
                ActionOutcome::Debug(Box::new(launch))
            }
        };

        self.last_action = Some(LastAction {
            kind,
            target,
            spec_key: document.key.clone(),
            spec_path: document.path.clone(),
            contexts,
            args,
        });
        Ok(outcome)
    }

    async fn debug_launch(
        &self,
        document: &TrackedDocument,
        root: &Path,
        target: &str,
        contexts: &ContextSelection,
        args: &ArgsSelection,
        no_cache: bool,
    ) -> Result<DebugLaunch> {
        let build_args: serde_json::Map<String, Value> =
            args.values.iter().map(|(name, value)| (name.clone(), Value::String(value.clone()))).collect();
        let configuration = DebugConfiguration {
            name: format!("Dalec: Debug {target}"),
            request: Some("launch".to_string()),
            target: Some(target.to_string()),
            spec_file: Some(document.path.display().to_string()),
            context: Some(contexts.default_context_path.clone()),
            build_args: Some(Value::Object(build_args)),
            build_contexts: contexts.additional_contexts.clone(),
            no_cache,
            ..DebugConfiguration::default()
        };

        let configuration = resolve_debug_configuration(configuration, Some(root), Some(&document.path))?;
        let launch = resolve_with_substituted_variables(&configuration, Some(root)).await?;
        let descriptor = adapter_descriptor(&self.assembler, &launch, &self.config.buildx.env);
        Ok(DebugLaunch {
            configuration,
            launch,
            descriptor,
        })
    }

    /// Report a failed action through the output sink. Cancellations (`Ok(None)`) stay silent.
    pub fn report<T>(&self, result: Result<Option<T>>) -> Option<T> {
        match result {
            Ok(value) => value,
            Err(error) => {
                self.output.error(&user_message(&error));
                None
            }
        }
    }
}

/// Message shown to the user for an aborted action.
pub fn user_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<DalecError>() {
        Some(DalecError::NotASpecDocument { .. }) => "Selected file is not recognized as a Dalec spec.".to_string(),
        Some(DalecError::NoActiveDocument) => {
            "Open a Dalec spec (first line must start with #syntax=...) to continue.".to_string()
        }
        _ => format!("{error:#}"),
    }
}

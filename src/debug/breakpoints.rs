//! Column resolution for line-only breakpoints in Dalec specs.
//!
//! Editors send YAML breakpoints with a line and no column. The buildx adapter resolves a
//! breakpoint to the mapping entry whose value separator sits at the given position, so the
//! mapper fills in the column of the `:` belonging to the key that starts on that line:
//!
//! 1. parse the file with tree-sitter-yaml and collect, per line, the columns of the `:`
//!    tokens of every mapping pair whose key starts there; when several pairs share a line,
//!    take the one closest to the text-scan column
//! 2. otherwise use the text-scan column: the first `:` of the line, else its first
//!    non-whitespace character
//! 3. a line without any `:` borrows the column of the nearest less-indented line above it
//!    that has one (the enclosing mapping key); the breakpoint keeps its own line
//!
//! Layouts are cached per path and rebuilt when the fingerprint (open-document version, or
//! on-disk modification time and size) changes. Nothing here ever fails a debug session:
//! every error leaves the breakpoint as the client sent it.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tree_sitter::{Node, Parser};

use super::protocol::{DapMessage, InitializeArguments, LoadedSourceBody, SetBreakpointsArguments};
use crate::tracker::{DocumentTracker, document_key};

/// Access to documents currently open in the host.
pub trait OpenDocuments {
    /// Version and text of the open document at `path`.
    fn open_text(&self, path: &Path) -> Option<(i64, String)>;
}

impl OpenDocuments for () {
    fn open_text(&self, _path: &Path) -> Option<(i64, String)> {
        None
    }
}

impl OpenDocuments for DocumentTracker {
    fn open_text(&self, path: &Path) -> Option<(i64, String)> {
        self.get(&document_key(path)).map(|doc| (doc.version, doc.text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fingerprint {
    Version(i64),
    Disk { modified: Option<SystemTime>, len: u64 },
}

/// Parsed positions of one source file. Lines and columns are zero-based, columns in
/// characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLayout {
    lines: Vec<String>,
    pair_colons: BTreeMap<usize, Vec<usize>>,
}

fn byte_to_char_column(line: &str, byte_column: usize) -> usize {
    line.char_indices().take_while(|(index, _)| *index < byte_column).count()
}

/// Indentation width; a tab counts as two spaces.
fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum()
}

fn scan_column(line: &str) -> Option<usize> {
    line.chars()
        .position(|c| c == ':')
        .or_else(|| line.chars().position(|c| !c.is_whitespace()))
}

fn colon_of_pair(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|child| child.kind() == ":")
}

impl SourceLayout {
    /// Build the layout of `text`. A file tree-sitter cannot parse cleanly gets text-scan
    /// positions only.
    pub fn parse(text: &str) -> Self {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let mut layout = Self {
            lines,
            pair_colons: BTreeMap::new(),
        };

        let mut parser = Parser::new();
        if parser.set_language(&tree_sitter_yaml::LANGUAGE.into()).is_err() {
            tracing::debug!(target: "dap", "tree-sitter-yaml grammar unavailable");
            return layout;
        }
        let Some(tree) = parser.parse(text, None) else {
            return layout;
        };
        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!(target: "dap", "YAML parse errors, using text positions");
            return layout;
        }

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if matches!(node.kind(), "block_mapping_pair" | "flow_pair") {
                let key = node.child_by_field_name("key");
                if let (Some(key), Some(colon)) = (key, colon_of_pair(node)) {
                    let row = key.start_position().row;
                    // Keys spanning lines put their colon elsewhere; only same-line pairs count.
                    if colon.start_position().row == row {
                        if let Some(line) = layout.lines.get(row) {
                            let column = byte_to_char_column(line, colon.start_position().column);
                            layout.pair_colons.entry(row).or_default().push(column);
                        }
                    }
                }
            }
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }
        for columns in layout.pair_colons.values_mut() {
            columns.sort_unstable();
            columns.dedup();
        }
        layout
    }

    fn column_on_line(&self, row: usize) -> Option<usize> {
        let line = self.lines.get(row)?;
        let scanned = scan_column(line);
        match (self.pair_colons.get(&row), scanned) {
            (Some(columns), Some(scanned)) => columns.iter().copied().min_by_key(|column| column.abs_diff(scanned)),
            (Some(columns), None) => columns.first().copied(),
            (None, scanned) => scanned,
        }
    }

    /// Column for a breakpoint on zero-based line `row`.
    pub fn column_for(&self, row: usize) -> Option<usize> {
        let line = self.lines.get(row)?;
        if line.contains(':') {
            return self.column_on_line(row);
        }
        if line.trim().is_empty() {
            return None;
        }

        let indent = indent_of(line);
        (0..row)
            .rev()
            .find(|&above| {
                let candidate = &self.lines[above];
                candidate.contains(':') && !candidate.trim().is_empty() && indent_of(candidate) < indent
            })
            .and_then(|above| self.column_on_line(above))
    }
}

#[derive(Debug, Clone)]
struct CachedLayout {
    fingerprint: Fingerprint,
    layout: SourceLayout,
}

/// Fills in columns of `setBreakpoints` requests. One mapper lives for one debug session.
#[derive(Debug, Clone)]
pub struct BreakpointMapper {
    positions: InitializeArguments,
    loaded_sources: HashMap<String, PathBuf>,
    layouts: HashMap<PathBuf, CachedLayout>,
}

impl Default for BreakpointMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakpointMapper {
    /// Mapper assuming one-based lines and columns until `initialize` says otherwise.
    pub fn new() -> Self {
        Self {
            positions: InitializeArguments::default(),
            loaded_sources: HashMap::new(),
            layouts: HashMap::new(),
        }
    }

    /// Record position conventions and loaded-source paths.
    pub fn observe(&mut self, message: &DapMessage) {
        match message {
            DapMessage::Initialize(arguments) => self.positions = *arguments,
            DapMessage::LoadedSource(body) => self.record_loaded_source(body),
            DapMessage::SetBreakpoints(_) | DapMessage::Other => {}
        }
    }

    fn record_loaded_source(&mut self, body: &LoadedSourceBody) {
        let (Some(name), Some(path)) = (&body.source.name, &body.source.path) else {
            return;
        };
        if body.reason == "removed" {
            self.loaded_sources.remove(name);
        } else {
            tracing::trace!(target: "dap", "Loaded source {name} -> {path}");
            self.loaded_sources.insert(name.clone(), PathBuf::from(path));
        }
    }

    fn source_path(&self, arguments: &SetBreakpointsArguments) -> Option<PathBuf> {
        if let Some(path) = &arguments.source.path {
            return Some(PathBuf::from(path));
        }
        let name = arguments.source.name.as_ref()?;
        self.loaded_sources.get(name).cloned()
    }

    async fn layout_for<D: OpenDocuments>(&mut self, path: &Path, documents: &D) -> Option<&SourceLayout> {
        let (fingerprint, text) = match documents.open_text(path) {
            Some((version, text)) => (Fingerprint::Version(version), Some(text)),
            None => {
                let metadata = tokio::fs::metadata(path).await.ok()?;
                let fingerprint = Fingerprint::Disk {
                    modified: metadata.modified().ok(),
                    len: metadata.len(),
                };
                (fingerprint, None)
            }
        };

        let fresh = self.layouts.get(path).is_some_and(|cached| cached.fingerprint == fingerprint);
        if !fresh {
            let text = match text {
                Some(text) => text,
                None => tokio::fs::read_to_string(path).await.ok()?,
            };
            tracing::debug!(target: "dap", "Parsing {} for breakpoint columns", path.display());
            self.layouts.insert(
                path.to_path_buf(),
                CachedLayout {
                    fingerprint,
                    layout: SourceLayout::parse(&text),
                },
            );
        }
        self.layouts.get(path).map(|cached| &cached.layout)
    }

    /// Fill in missing columns. Returns whether any breakpoint changed.
    pub async fn remap<D: OpenDocuments>(&mut self, arguments: &mut SetBreakpointsArguments, documents: &D) -> bool {
        let needs_columns = arguments
            .breakpoints
            .as_ref()
            .is_some_and(|breakpoints| breakpoints.iter().any(|bp| bp.column.is_none()));
        if !needs_columns {
            return false;
        }
        let Some(path) = self.source_path(arguments) else {
            return false;
        };

        let line_base = i64::from(self.positions.lines_start_at1);
        let column_base = i64::from(self.positions.columns_start_at1);
        let Some(layout) = self.layout_for(&path, documents).await else {
            return false;
        };

        let mut changed = false;
        for breakpoint in arguments.breakpoints.iter_mut().flatten() {
            if breakpoint.column.is_some() {
                continue;
            }
            let Some(row) = breakpoint.line.checked_sub(line_base).and_then(|row| usize::try_from(row).ok()) else {
                continue;
            };
            let Some(column) = layout.column_for(row).and_then(|column| i64::try_from(column).ok()) else {
                continue;
            };
            breakpoint.column = Some(column + column_base);
            changed = true;
        }
        changed
    }
}

//! Per-file scanning: read, parse, find classes, extract.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use tracing::{debug, error};
use tree_sitter::Node;

use crate::analysis::{
    parse_python, ClassExtractor, ClassRecord, ParsedSource, Reconstructor, DEFAULT_MAX_DEPTH,
};
use crate::config::SyntaxErrorPolicy;

use super::{ErrorEntry, ErrorKind};

/// Classes and errors found in one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileScan {
    pub classes: Vec<ClassRecord>,
    pub errors: Vec<ErrorEntry>,
}

/// Scans single files. Never fails: every problem becomes an [`ErrorEntry`].
#[derive(Debug, Clone)]
pub struct FileScanner {
    marker_base: Option<String>,
    syntax_errors: SyntaxErrorPolicy,
    max_depth: usize,
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FileScanner {
    pub fn new() -> Self {
        Self {
            marker_base: None,
            syntax_errors: SyntaxErrorPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Keep only classes whose bases mention `marker`.
    pub fn marker_base(mut self, marker: Option<String>) -> Self {
        self.marker_base = marker;
        self
    }

    pub fn syntax_errors(mut self, policy: SyntaxErrorPolicy) -> Self {
        self.syntax_errors = policy;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Scan one file.
    pub fn scan(&self, path: &Path) -> FileScan {
        let file_name = path.display().to_string();
        let mut result = FileScan::default();

        let source = match read_source(path) {
            Ok(source) => source,
            Err(entry) => {
                error!(file = %file_name, "{}", entry.error);
                result.errors.push(entry);
                return result;
            }
        };

        let parsed = match parse_python(path, source) {
            Ok(parsed) => parsed,
            Err(e) => {
                result.errors.push(structural_error(&file_name, &e));
                return result;
            }
        };

        if let Some(site) = parsed.first_syntax_error() {
            let message = format!("Syntax error in file {}: {}", file_name, site);
            error!(file = %file_name, "{}", message);
            result
                .errors
                .push(ErrorEntry::for_file(&file_name, ErrorKind::Syntax, message));
            if self.syntax_errors != SyntaxErrorPolicy::Recover {
                return result;
            }
        }

        let extractor = ClassExtractor::with_reconstructor(
            Reconstructor::new(&parsed.source).with_max_depth(self.max_depth),
        );
        for node in class_nodes(&parsed) {
            match extractor.extract(node) {
                Ok(mut record) => {
                    if let Some(marker) = &self.marker_base {
                        if !record.has_base_matching(marker) {
                            debug!(file = %file_name, class = %record.name, "No base matches {}", marker);
                            continue;
                        }
                    }
                    record.file = Some(file_name.clone());
                    result.classes.push(record);
                }
                Err(e) => {
                    let class = node
                        .child_by_field_name("name")
                        .map(|n| parsed.node_text(n).to_string())
                        .unwrap_or_default();
                    let message =
                        format!("Error extracting class {} in file {}: {}", class, file_name, e);
                    error!(file = %file_name, class = %class, "{}", message);
                    result
                        .errors
                        .push(ErrorEntry::for_class(&file_name, class, message));
                }
            }
        }

        debug!(file = %file_name, classes = result.classes.len(), "Scanned file");
        result
    }
}

/// Read a file as UTF-8 text, dropping a leading byte order mark.
fn read_source(path: &Path) -> Result<String, ErrorEntry> {
    let file_name = path.display().to_string();
    let bytes = fs::read(path).map_err(|e| {
        let message = format!("Error reading file {}: {}", file_name, e);
        ErrorEntry::for_file(&file_name, ErrorKind::UnreadableFile, message)
    })?;
    let mut text = String::from_utf8(bytes).map_err(|e| {
        let message = format!("Error reading file {}: {}", file_name, e);
        ErrorEntry::for_file(&file_name, ErrorKind::UndecodableFile, message)
    })?;
    if text.starts_with('\u{feff}') {
        text.drain(..'\u{feff}'.len_utf8());
    }
    Ok(text)
}

fn structural_error(file: &str, err: &dyn std::fmt::Display) -> ErrorEntry {
    let message = format!("Error parsing AST in file {}: {}", file, err);
    error!(file, "{}", message);
    ErrorEntry::for_file(file, ErrorKind::StructuralParse, message)
}

/// Wrapper nodes that have no counterpart level in Python's own AST.
const TRANSPARENT: &[&str] = &["block", "decorated_definition", "else_clause", "finally_clause"];

/// Every class definition in the tree, at any depth, breadth first.
///
/// Classes at the same nesting level come out in source order, and all of
/// them before any class nested one level deeper.
fn class_nodes(parsed: &ParsedSource) -> Vec<Node<'_>> {
    let mut found = Vec::new();
    let mut queue = VecDeque::from([parsed.root()]);
    while let Some(node) = queue.pop_front() {
        if node.kind() == "class_definition" {
            found.push(node);
        }
        enqueue_children(node, &mut queue);
    }
    found
}

/// Queue the children of `node`, looking through transparent wrappers.
fn enqueue_children<'t>(node: Node<'t>, queue: &mut VecDeque<Node<'t>>) {
    let mut cursor = node.walk();
    let mut pending: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    pending.reverse();
    while let Some(child) = pending.pop() {
        if TRANSPARENT.contains(&child.kind()) {
            let mut inner = child.walk();
            let children: Vec<Node<'t>> = child.named_children(&mut inner).collect();
            pending.extend(children.into_iter().rev());
        } else {
            queue.push_back(child);
        }
    }
}

//! Directory-tree scanning across one or more roots.

use std::path::{Path, PathBuf};

use globset::GlobSet;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::analysis::ClassRecord;
use crate::config::{ScanConfig, SyntaxErrorPolicy};

use super::{ErrorEntry, ErrorKind, FileScan, FileScanner};

const SOURCE_EXTENSION: &str = "py";

/// Aggregated output of a scan. Field names are the JSON contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanResult {
    pub scanned_folders: Vec<String>,
    /// Files that contributed at least one class.
    pub files: Vec<String>,
    pub classes: Vec<ClassRecord>,
    pub errors: Vec<ErrorEntry>,
}

impl ScanResult {
    /// Classes grouped by source file, in scan order.
    pub fn classes_by_file(&self) -> IndexMap<&str, Vec<&ClassRecord>> {
        let mut grouped: IndexMap<&str, Vec<&ClassRecord>> = IndexMap::new();
        for class in &self.classes {
            let file = class.file.as_deref().unwrap_or("Unknown file");
            grouped.entry(file).or_default().push(class);
        }
        grouped
    }

    pub fn class(&self, name: &str) -> Option<&ClassRecord> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn errors_of_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &ErrorEntry> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

/// Scans every Python file under a set of roots.
pub struct Scanner {
    roots: Vec<PathBuf>,
    files: FileScanner,
    syntax_errors: SyntaxErrorPolicy,
    exclude: GlobSet,
    parallel: bool,
}

impl Scanner {
    /// Create a scanner over `roots` with default settings.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            files: FileScanner::new(),
            syntax_errors: SyntaxErrorPolicy::default(),
            exclude: GlobSet::empty(),
            parallel: false,
        }
    }

    /// Create a scanner from a validated config.
    pub fn from_config(config: &ScanConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self::new(config.roots.iter().cloned())
            .marker_base(config.marker_base.clone())
            .syntax_errors(config.syntax_errors)
            .max_depth(config.max_depth)
            .exclude(config.exclude_set()?)
            .parallel(config.parallel))
    }

    pub fn marker_base(mut self, marker: Option<String>) -> Self {
        self.files = self.files.marker_base(marker);
        self
    }

    pub fn syntax_errors(mut self, policy: SyntaxErrorPolicy) -> Self {
        self.syntax_errors = policy;
        self.files = self.files.syntax_errors(policy);
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.files = self.files.max_depth(max_depth);
        self
    }

    pub fn exclude(mut self, exclude: GlobSet) -> Self {
        self.exclude = exclude;
        self
    }

    /// Scan files on the rayon pool. Output order is unchanged.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Scan all roots. Never fails; problems are reported in `errors`.
    pub fn scan(&self) -> ScanResult {
        let mut result = ScanResult {
            scanned_folders: self.roots.iter().map(|r| r.display().to_string()).collect(),
            ..Default::default()
        };

        for root in &self.roots {
            let folder_name = root.display().to_string();
            if !root.exists() {
                let message = format!("Folder does not exist: {}", folder_name);
                error!(folder = %folder_name, "{}", message);
                result
                    .errors
                    .push(ErrorEntry::for_folder(folder_name, ErrorKind::MissingRoot, message));
                continue;
            }

            let files = self.collect_files(root, &mut result.errors);
            info!(folder = %folder_name, files = files.len(), "Scanning folder");

            let scans: Vec<FileScan> = if self.parallel {
                files.par_iter().map(|path| self.files.scan(path)).collect()
            } else {
                files.iter().map(|path| self.files.scan(path)).collect()
            };
            for (path, scan) in files.iter().zip(scans) {
                self.merge(&mut result, path, scan);
            }
        }

        info!(
            classes = result.classes.len(),
            errors = result.errors.len(),
            "Scan complete"
        );
        result
    }

    fn merge(&self, result: &mut ScanResult, path: &Path, scan: FileScan) {
        if !scan.classes.is_empty() {
            result.files.push(path.display().to_string());
            result.classes.extend(scan.classes);
        }
        for entry in scan.errors {
            if entry.kind == ErrorKind::Syntax && !self.syntax_errors.reports() {
                info!(file = %path.display(), "Skipping syntax error from file");
                continue;
            }
            result.errors.push(entry);
        }
    }

    /// Python files under `root`, sorted by name at every level.
    fn collect_files(&self, root: &Path, errors: &mut Vec<ErrorEntry>) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded(root, e.path()));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let is_source = entry.file_type().is_file()
                        && entry.path().extension().and_then(|e| e.to_str())
                            == Some(SOURCE_EXTENSION);
                    if is_source {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    let location = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    let message = format!("Error walking {}: {}", location, e);
                    warn!(folder = %root.display(), "{}", message);
                    errors.push(ErrorEntry {
                        folder: Some(root.display().to_string()),
                        file: e.path().map(|p| p.display().to_string()),
                        class: None,
                        error: message,
                        kind: ErrorKind::Traversal,
                    });
                }
            }
        }
        files
    }

    /// Match excludes against the full path and the path below the root.
    fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        self.exclude.is_match(path)
            || path
                .strip_prefix(root)
                .map(|rel| !rel.as_os_str().is_empty() && self.exclude.is_match(rel))
                .unwrap_or(false)
    }
}

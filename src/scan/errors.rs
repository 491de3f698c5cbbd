//! Error entries collected during a scan.

use serde::Serialize;

/// What went wrong, for filtering and tests. Not part of the JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingRoot,
    Traversal,
    UnreadableFile,
    UndecodableFile,
    Syntax,
    StructuralParse,
    ClassExtraction,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingRoot => "missing_root",
            ErrorKind::Traversal => "traversal",
            ErrorKind::UnreadableFile => "unreadable_file",
            ErrorKind::UndecodableFile => "undecodable_file",
            ErrorKind::Syntax => "syntax",
            ErrorKind::StructuralParse => "structural_parse",
            ErrorKind::ClassExtraction => "class_extraction",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One problem found while scanning, with the location it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub error: String,
    #[serde(skip)]
    pub kind: ErrorKind,
}

impl ErrorEntry {
    pub fn for_folder(folder: impl Into<String>, kind: ErrorKind, error: String) -> Self {
        Self {
            folder: Some(folder.into()),
            file: None,
            class: None,
            error,
            kind,
        }
    }

    pub fn for_file(file: impl Into<String>, kind: ErrorKind, error: String) -> Self {
        Self {
            folder: None,
            file: Some(file.into()),
            class: None,
            error,
            kind,
        }
    }

    pub fn for_class(file: impl Into<String>, class: impl Into<String>, error: String) -> Self {
        Self {
            folder: None,
            file: Some(file.into()),
            class: Some(class.into()),
            error,
            kind: ErrorKind::ClassExtraction,
        }
    }
}

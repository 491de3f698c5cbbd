//! classscan - static class metadata extraction for Python source trees.
//!
//! classscan walks directories of Python files and describes every class
//! definition it finds: name, bases, docstring, decorators, attributes
//! with their literal values, and methods with full signatures. The
//! scanned code is never imported or executed; values are rebuilt from
//! the syntax tree, and anything that is not a literal is kept as source
//! text.
//!
//! # Architecture
//!
//! - `analysis`: tree-sitter parsing, literal reconstruction, class extraction
//! - `scan`: per-file and per-directory scanning with error collection
//! - `config`: YAML scan configuration
//! - `report`: output formatting (JSON, pretty)
//! - `cli`: command-line entry points
//!
//! # Example
//!
//! ```no_run
//! use classscan::Scanner;
//!
//! let result = Scanner::new(["./nodes"])
//!     .marker_base(Some("NodeBase".to_string()))
//!     .scan();
//! for class in &result.classes {
//!     println!("{} ({} methods)", class.name, class.methods.len());
//! }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod report;
pub mod scan;

pub use analysis::{
    ArgumentRecord, ArgumentsBundle, AttributeValue, ClassExtractor, ClassRecord, MethodRecord,
    Placeholder, Reconstructor, Value,
};
pub use config::{ScanConfig, SyntaxErrorPolicy};
pub use scan::{ErrorEntry, ErrorKind, FileScanner, ScanResult, Scanner};

/// Scan `folders` with default settings and return the result as
/// pretty-printed JSON.
pub fn parse_folders<I, P>(folders: I) -> serde_json::Result<String>
where
    I: IntoIterator<Item = P>,
    P: Into<std::path::PathBuf>,
{
    report::to_json(&Scanner::new(folders).scan())
}

//! File and directory scanning.
//!
//! [`Scanner`] walks the configured roots and hands each Python file to a
//! [`FileScanner`]. Problems never abort a scan; they are collected as
//! [`ErrorEntry`] values next to the classes that were extracted.

mod errors;
mod file;
mod tree;

pub use errors::{ErrorEntry, ErrorKind};
pub use file::{FileScan, FileScanner};
pub use tree::{ScanResult, Scanner};

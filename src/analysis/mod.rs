//! Static analysis of Python source.
//!
//! Nothing here executes the scanned code. A file is parsed with
//! tree-sitter, and values are rebuilt from the shape of the tree alone.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌───────────────┐
//! │ ParsedSource │────▶│ ClassExtractor │────▶│ ClassRecord   │
//! └──────────────┘     └────────────────┘     │ (bases, attrs,│
//!                              │              │  methods, ..) │
//!                              ▼              └───────────────┘
//!                      ┌────────────────┐
//!                      │ Reconstructor  │──▶ Value
//!                      └────────────────┘
//! ```
//!
//! The [`Reconstructor`] handles literal values, [`render`] re-emits
//! expressions as source text, and [`ClassExtractor`] combines the two
//! per class, recording failures instead of aborting.

mod extract;
mod literal;
mod reconstruct;
mod records;
mod render;
mod syntax;
mod traits;
mod value;

pub use extract::{ClassExtractor, ExtractError};
pub use literal::{clean_docstring, LiteralError};
pub use reconstruct::{ReconstructError, Reconstructor, DEFAULT_MAX_DEPTH};
pub use records::{
    ArgumentRecord, ArgumentsBundle, AttributeValue, ClassRecord, DefaultRecord, MethodRecord,
};
pub use render::{render, RenderError};
pub use syntax::{SyntaxErrorSite, SyntaxProblem};
pub use traits::{parse_python, python_language, ParseError, ParsedSource};
pub use value::{Placeholder, Value};

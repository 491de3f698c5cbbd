//! Parsed Python source and the tree-sitter entry point.

use std::path::Path;

use tree_sitter::{Language, Node, Parser};

use super::syntax::{self, SyntaxErrorSite};

/// Errors that prevent a syntax tree from being produced at all.
///
/// Invalid Python is *not* one of these: tree-sitter still returns a tree,
/// with `ERROR` and `MISSING` nodes marking the damage.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("cannot load Python grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),
    #[error("parser produced no tree for {0}")]
    NoTree(String),
}

/// Holds a parsed tree-sitter tree and the source it was built from.
pub struct ParsedSource {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: String,
    /// The file path (for error reporting).
    pub path: String,
}

impl ParsedSource {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Locate the first syntax error in document order, if any.
    ///
    /// Covers both text tree-sitter could not parse and constructs it
    /// accepts that Python 3 rejects.
    pub fn first_syntax_error(&self) -> Option<SyntaxErrorSite> {
        let damaged = syntax::first_damaged(self.root());
        let rule = syntax::first_rule_violation(self.root(), &self.source);
        damaged
            .into_iter()
            .chain(rule)
            .min_by_key(|site| (site.line, site.column))
    }
}

/// The tree-sitter Python grammar.
pub fn python_language() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

/// Parse Python source into a tree.
pub fn parse_python(path: &Path, source: String) -> Result<ParsedSource, ParseError> {
    let mut parser = Parser::new();
    parser.set_language(&python_language())?;
    let tree = parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| ParseError::NoTree(path.display().to_string()))?;

    Ok(ParsedSource {
        tree,
        source,
        path: path.to_string_lossy().to_string(),
    })
}

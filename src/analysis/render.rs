//! Source-text rendering of expression nodes.

use tree_sitter::Node;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("`{kind}` at line {line} contains invalid syntax")]
    Malformed { kind: &'static str, line: usize },
    #[error("`{kind}` expected at line {line} is missing from the source")]
    Missing { kind: &'static str, line: usize },
    #[error("node text is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Re-emit the textual form of an expression exactly as written.
///
/// Fails when the node is, or contains, a node tree-sitter recovered from
/// a syntax error: that text is not a valid expression.
pub fn render(node: Node, source: &str) -> Result<String, RenderError> {
    let line = node.start_position().row + 1;
    if node.is_missing() {
        return Err(RenderError::Missing {
            kind: node.kind(),
            line,
        });
    }
    if node.has_error() {
        return Err(RenderError::Malformed {
            kind: node.kind(),
            line,
        });
    }
    Ok(node.utf8_text(source.as_bytes())?.to_string())
}

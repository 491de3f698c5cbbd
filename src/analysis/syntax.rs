//! Syntax errors: where they are and what they are.
//!
//! tree-sitter-python is a permissive grammar. Besides the `ERROR` and
//! `MISSING` nodes it produces for damaged input, it accepts a few
//! constructs Python 3 rejects at compile time. Those are found here by a
//! separate walk over an otherwise clean tree.

use std::fmt;

use tree_sitter::Node;

use super::literal;

/// What is wrong at a [`SyntaxErrorSite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxProblem {
    /// tree-sitter could not parse the text.
    Invalid,
    /// tree-sitter had to invent a token of this kind.
    Missing(String),
    /// A Python 2 `print` or `exec` statement.
    LegacyStatement(&'static str),
    /// Positional parameter without a default after one with a default.
    DefaultOrder(String),
    /// Truncated or out-of-range `\x`, `\u` or `\U` escape.
    Escape(String),
}

impl fmt::Display for SyntaxProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxProblem::Invalid => f.write_str("invalid syntax"),
            SyntaxProblem::Missing(kind) => write!(f, "missing `{}`", kind),
            SyntaxProblem::LegacyStatement(keyword) => {
                write!(f, "Python 2 `{}` statement", keyword)
            }
            SyntaxProblem::DefaultOrder(name) => write!(
                f,
                "parameter `{}` without a default follows parameter with a default",
                name
            ),
            SyntaxProblem::Escape(escape) => write!(f, "invalid `{}` escape", escape),
        }
    }
}

/// Where and what a syntax error is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorSite {
    /// Line (1-indexed).
    pub line: usize,
    /// Column (1-indexed).
    pub column: usize,
    pub problem: SyntaxProblem,
}

impl SyntaxErrorSite {
    pub(crate) fn at(node: Node, problem: SyntaxProblem) -> Self {
        let start = node.start_position();
        Self {
            line: start.row + 1,
            column: start.column + 1,
            problem,
        }
    }
}

impl fmt::Display for SyntaxErrorSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {}",
            self.problem, self.line, self.column
        )
    }
}

/// First node tree-sitter marked as `ERROR` or `MISSING`.
pub(crate) fn first_damaged(root: Node) -> Option<SyntaxErrorSite> {
    let mut node = root;
    if !node.has_error() {
        return None;
    }
    loop {
        if node.is_missing() {
            return Some(SyntaxErrorSite::at(
                node,
                SyntaxProblem::Missing(node.kind().to_string()),
            ));
        }
        if node.is_error() {
            return Some(SyntaxErrorSite::at(node, SyntaxProblem::Invalid));
        }
        let mut cursor = node.walk();
        let next = node
            .children(&mut cursor)
            .find(|child| child.has_error() || child.is_missing());
        match next {
            Some(child) => node = child,
            None => return Some(SyntaxErrorSite::at(node, SyntaxProblem::Invalid)),
        }
    }
}

/// First construct, in document order, that parses but is not Python 3.
///
/// The walk is iterative, so arbitrarily deep trees are fine.
pub(crate) fn first_rule_violation(root: Node, source: &str) -> Option<SyntaxErrorSite> {
    let mut cursor = root.walk();
    loop {
        if let Some(site) = check_node(cursor.node(), source) {
            return Some(site);
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn check_node(node: Node, source: &str) -> Option<SyntaxErrorSite> {
    match node.kind() {
        "print_statement" => Some(SyntaxErrorSite::at(
            node,
            SyntaxProblem::LegacyStatement("print"),
        )),
        "exec_statement" => Some(SyntaxErrorSite::at(
            node,
            SyntaxProblem::LegacyStatement("exec"),
        )),
        "parameters" | "lambda_parameters" => default_order(node, source),
        "string" => string_escapes(node, source),
        _ => None,
    }
}

/// Once a positional parameter has a default, every later positional one
/// needs one too. `*`, `*args` and `**kwargs` end the positional run.
fn default_order(params: Node, source: &str) -> Option<SyntaxErrorSite> {
    let mut seen_default = false;
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        let name = match param.kind() {
            "default_parameter" | "typed_default_parameter" => {
                seen_default = true;
                continue;
            }
            "keyword_separator" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                return None;
            }
            "identifier" => param,
            "typed_parameter" => match param.named_child(0) {
                Some(inner)
                    if matches!(
                        inner.kind(),
                        "list_splat_pattern" | "dictionary_splat_pattern"
                    ) =>
                {
                    return None
                }
                Some(inner) => inner,
                None => continue,
            },
            _ => continue,
        };
        if seen_default {
            let text = name.utf8_text(source.as_bytes()).unwrap_or("?");
            return Some(SyntaxErrorSite::at(
                param,
                SyntaxProblem::DefaultOrder(text.to_string()),
            ));
        }
    }
    None
}

fn string_escapes(string: Node, source: &str) -> Option<SyntaxErrorSite> {
    let opener = string
        .child(0)
        .filter(|start| start.kind() == "string_start")?
        .utf8_text(source.as_bytes())
        .ok()?
        .to_ascii_lowercase();
    if opener.contains('r') {
        return None;
    }
    let bytes = opener.contains('b');

    let mut cursor = string.walk();
    for part in string.named_children(&mut cursor) {
        if part.kind() != "string_content" {
            continue;
        }
        let Ok(text) = part.utf8_text(source.as_bytes()) else {
            continue;
        };
        if let Some(escape) = literal::malformed_escape(text, bytes) {
            return Some(SyntaxErrorSite::at(part, SyntaxProblem::Escape(escape)));
        }
    }
    None
}

//! Literal-value reconstruction from syntax-tree nodes.
//!
//! [`Reconstructor::reconstruct`] turns any expression node into a
//! [`Value`] without evaluating code:
//!
//! 1. scalar literals become their value
//! 2. dict literals become ordered mappings
//! 3. list literals become sequences
//! 4. tuple literals become fixed sequences
//! 5. set literals become de-duplicated collections
//! 6. `True`/`False`/`None` identifiers become literals, other names their text
//! 7. everything else becomes its source text
//!
//! Failures are contained per element: one bad dict value yields a
//! placeholder for that value while its siblings are still reconstructed.

use tree_sitter::Node;
use tracing::{error, warn};

use super::literal::{self, LiteralError, StringLiteral};
use super::render::render;
use super::value::{Placeholder, Value};

/// Default limit on container nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ReconstructError {
    #[error("`{kind}` at line {line} nests deeper than {limit} levels")]
    TooDeep {
        kind: &'static str,
        line: usize,
        limit: usize,
    },
    #[error("`{kind}` expected at line {line} is missing from the source")]
    Missing { kind: &'static str, line: usize },
    #[error("`{kind}` at line {line} has no inner expression")]
    Empty { kind: &'static str, line: usize },
    #[error("malformed literal at line {line}: {source}")]
    Literal {
        line: usize,
        #[source]
        source: LiteralError,
    },
}

/// Converts expression nodes of one source file into values.
///
/// Stateless apart from its configuration: reconstructing the same node
/// twice yields identical output.
#[derive(Debug, Clone, Copy)]
pub struct Reconstructor<'s> {
    source: &'s str,
    max_depth: usize,
}

impl<'s> Reconstructor<'s> {
    /// Create a reconstructor over the source the nodes were parsed from.
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the container nesting limit. Containers nested deeper are
    /// replaced by a placeholder.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    /// Reconstruct a node. Never fails: a failure of the node as a whole
    /// yields [`Placeholder::Error`].
    pub fn reconstruct(&self, node: Node) -> Value {
        match self.try_reconstruct(node) {
            Ok(value) => value,
            Err(e) => {
                error!(line = node.start_position().row + 1, "Error parsing AST node: {}", e);
                Value::Placeholder(Placeholder::Error)
            }
        }
    }

    /// Reconstruct a node, reporting a failure of the node as a whole.
    ///
    /// Failures inside containers never surface here; they are replaced
    /// element by element.
    pub fn try_reconstruct(&self, node: Node) -> Result<Value, ReconstructError> {
        self.value_at(node, 0)
    }

    fn value_at(&self, node: Node, depth: usize) -> Result<Value, ReconstructError> {
        let line = node.start_position().row + 1;
        if node.is_missing() {
            return Err(ReconstructError::Missing {
                kind: node.kind(),
                line,
            });
        }
        if node.is_error() {
            return Ok(self.source_text(node));
        }

        match node.kind() {
            "integer" => Ok(self
                .token(node)
                .and_then(literal::decode_integer)
                .map(Value::Int)
                .unwrap_or_else(|| self.source_text(node))),
            "float" => Ok(self
                .token(node)
                .and_then(literal::decode_float)
                .map(Value::Float)
                .unwrap_or_else(|| self.source_text(node))),
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "none" => Ok(Value::None),
            "string" | "concatenated_string" => self.string(node, line),
            "parenthesized_expression" => {
                let mut inner = node;
                let mut levels = 0;
                while inner.kind() == "parenthesized_expression" {
                    if levels > self.max_depth {
                        return Err(ReconstructError::TooDeep {
                            kind: node.kind(),
                            line,
                            limit: self.max_depth,
                        });
                    }
                    inner = named_items(inner)
                        .into_iter()
                        .next()
                        .ok_or(ReconstructError::Empty {
                            kind: inner.kind(),
                            line: inner.start_position().row + 1,
                        })?;
                    levels += 1;
                }
                self.value_at(inner, depth)
            }
            "dictionary" => {
                self.check_depth(node, depth)?;
                Ok(Value::dict_from(self.pairs(node, depth + 1)))
            }
            "list" => {
                self.check_depth(node, depth)?;
                Ok(Value::List(self.elements(node, depth + 1)))
            }
            "tuple" | "expression_list" => {
                self.check_depth(node, depth)?;
                Ok(Value::Tuple(self.elements(node, depth + 1)))
            }
            "set" => {
                self.check_depth(node, depth)?;
                Ok(Value::set_from(self.elements(node, depth + 1)))
            }
            "identifier" => Ok(match self.token(node).unwrap_or("") {
                "True" => Value::Bool(true),
                "False" => Value::Bool(false),
                "None" => Value::None,
                name => Value::Name(name.to_string()),
            }),
            _ => Ok(self.source_text(node)),
        }
    }

    fn check_depth(&self, node: Node, depth: usize) -> Result<(), ReconstructError> {
        if depth > self.max_depth {
            return Err(ReconstructError::TooDeep {
                kind: node.kind(),
                line: node.start_position().row + 1,
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn string(&self, node: Node, line: usize) -> Result<Value, ReconstructError> {
        match literal::decode_string(node, self.source) {
            Ok(StringLiteral::Str(s)) => Ok(Value::Str(s)),
            Ok(StringLiteral::Bytes(b)) => Ok(Value::Bytes(b)),
            Err(e) if e.is_unsupported() => Ok(self.source_text(node)),
            Err(source) => Err(ReconstructError::Literal { line, source }),
        }
    }

    fn elements(&self, node: Node, depth: usize) -> Vec<Value> {
        named_items(node)
            .into_iter()
            .map(|child| self.element(child, depth, "sequence element"))
            .collect()
    }

    fn pairs(&self, node: Node, depth: usize) -> Vec<(Value, Value)> {
        let mut pairs = Vec::new();
        for child in named_items(node) {
            if child.kind() != "pair" {
                warn!(
                    line = child.start_position().row + 1,
                    "Skipping `{}` entry in dict literal",
                    child.kind()
                );
                continue;
            }
            let key = match child.child_by_field_name("key") {
                Some(k) => self.element(k, depth, "dict key"),
                None => Value::Placeholder(Placeholder::Element),
            };
            let value = match child.child_by_field_name("value") {
                Some(v) => self.element(v, depth, "dict value"),
                None => Value::Placeholder(Placeholder::Element),
            };
            pairs.push((key, value));
        }
        pairs
    }

    fn element(&self, node: Node, depth: usize, what: &str) -> Value {
        match self.value_at(node, depth) {
            Ok(value) => value,
            Err(e) => {
                error!(line = node.start_position().row + 1, "Error parsing {}: {}", what, e);
                Value::Placeholder(Placeholder::Element)
            }
        }
    }

    fn token(&self, node: Node) -> Option<&'s str> {
        node.utf8_text(self.source.as_bytes()).ok()
    }

    /// Fallback for shapes without a structural reconstruction.
    fn source_text(&self, node: Node) -> Value {
        match render(node, self.source) {
            Ok(text) => Value::Expr(text),
            Err(e) => {
                error!("Unsupported node type with unparse error: {}", e);
                Value::Placeholder(Placeholder::Unparse)
            }
        }
    }
}

/// Named children that carry content (comments dropped).
fn named_items(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{parse_python, ParsedSource};
    use std::path::Path;

    fn parse(source: &str) -> ParsedSource {
        parse_python(Path::new("t.py"), source.to_string()).unwrap()
    }

    /// Right-hand side of the first statement `x = <expr>`.
    fn rhs(parsed: &ParsedSource) -> Node<'_> {
        parsed
            .root()
            .named_child(0)
            .and_then(|stmt| stmt.named_child(0))
            .and_then(|assign| assign.child_by_field_name("right"))
            .expect("source should start with an assignment")
    }

    fn value_of(expr: &str) -> Value {
        let parsed = parse(&format!("x = {}\n", expr));
        Reconstructor::new(&parsed.source).reconstruct(rhs(&parsed))
    }

    #[test]
    fn test_scalars() {
        assert_eq!(value_of("42"), Value::Int(42));
        assert_eq!(value_of("0.25"), Value::Float(0.25));
        assert_eq!(value_of("'text'"), Value::from("text"));
        assert_eq!(value_of("b'raw'"), Value::Bytes(b"raw".to_vec()));
        assert_eq!(value_of("True"), Value::Bool(true));
        assert_eq!(value_of("False"), Value::Bool(false));
        assert_eq!(value_of("None"), Value::None);
        assert_eq!(value_of("(7)"), Value::Int(7));
    }

    #[test]
    fn test_nested_mapping_round_trip() {
        let value = value_of(r#"{"a": {"type": "number", "options": ["x", "y"]}, "b": 1}"#);
        let expected = Value::Dict(vec![
            (
                "a".into(),
                Value::Dict(vec![
                    ("type".into(), "number".into()),
                    ("options".into(), Value::List(vec!["x".into(), "y".into()])),
                ]),
            ),
            ("b".into(), Value::Int(1)),
        ]);
        assert_eq!(value, expected);
    }

    #[test]
    fn test_sequences_and_sets() {
        assert_eq!(
            value_of("[1, 'two', None]"),
            Value::List(vec![Value::Int(1), "two".into(), Value::None])
        );
        assert_eq!(
            value_of("(1, 2)"),
            Value::Tuple(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(value_of("()"), Value::Tuple(vec![]));
        assert_eq!(
            value_of("'a', 'b'"),
            Value::Tuple(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            value_of("{3, 1, 3}"),
            Value::Set(vec![Value::Int(3), Value::Int(1)])
        );
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let value = value_of("{'k': 1, 'other': 2, 'k': 3}");
        assert_eq!(
            value,
            Value::Dict(vec![("k".into(), Value::Int(3)), ("other".into(), Value::Int(2))])
        );
    }

    #[test]
    fn test_identifiers_are_returned_by_name() {
        assert_eq!(value_of("DEFAULT_MODE"), Value::Name("DEFAULT_MODE".into()));
    }

    #[test]
    fn test_other_shapes_fall_back_to_source_text() {
        assert_eq!(value_of("-1"), Value::Expr("-1".into()));
        assert_eq!(value_of("os.path.join('a', 'b')"), Value::Expr("os.path.join('a', 'b')".into()));
        assert_eq!(value_of("lambda v: v * 2"), Value::Expr("lambda v: v * 2".into()));
        assert_eq!(value_of("f'{name}!'"), Value::Expr("f'{name}!'".into()));
        assert_eq!(value_of("[i for i in range(3)]"), Value::Expr("[i for i in range(3)]".into()));
        assert_eq!(value_of("10 ** 30"), Value::Expr("10 ** 30".into()));
    }

    #[test]
    fn test_wide_integers() {
        assert_eq!(
            value_of("0xFFFFFFFFFFFFFFFF"),
            Value::Int(18_446_744_073_709_551_615)
        );
        assert_eq!(
            value_of("123456789012345678901234567890"),
            Value::Int(123_456_789_012_345_678_901_234_567_890)
        );
        let huge = format!("1{}", "0".repeat(40));
        assert_eq!(value_of(&huge), Value::Expr(huge.clone()));
    }

    #[test]
    fn test_nested_parentheses() {
        let shallow = format!("{}7{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(value_of(&shallow), Value::Int(7));

        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(value_of(&deep), Value::Placeholder(Placeholder::Error));

        let parsed = parse(&format!("x = {}\n", deep));
        let err = Reconstructor::new(&parsed.source)
            .try_reconstruct(rhs(&parsed))
            .unwrap_err();
        assert!(matches!(err, ReconstructError::TooDeep { limit: DEFAULT_MAX_DEPTH, .. }));
    }

    #[test]
    fn test_thousands_of_parentheses_do_not_exhaust_the_stack() {
        let deep = format!("[{}1{}, 2]", "(".repeat(5000), ")".repeat(5000));
        assert_eq!(
            value_of(&deep),
            Value::List(vec![Value::Placeholder(Placeholder::Element), Value::Int(2)])
        );
    }

    #[test]
    fn test_comments_inside_containers_are_ignored() {
        let value = value_of("[\n    1,  # first\n    2,\n]");
        assert_eq!(value, Value::List(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_element_failure_is_isolated() {
        let parsed = parse("x = {'a': 1, 'b': [2], 'c': 3}\n");
        let value = Reconstructor::new(&parsed.source)
            .with_max_depth(0)
            .reconstruct(rhs(&parsed));
        let pairs = value.as_dict().expect("mapping survives");
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], ("a".into(), Value::Int(1)));
        assert_eq!(pairs[1], ("b".into(), Value::Placeholder(Placeholder::Element)));
        assert_eq!(pairs[2], ("c".into(), Value::Int(3)));
    }

    #[test]
    fn test_sequence_element_failure_is_isolated() {
        let parsed = parse("x = [1, (2, 3), {4}]\n");
        let value = Reconstructor::new(&parsed.source)
            .with_max_depth(0)
            .reconstruct(rhs(&parsed));
        assert_eq!(
            value,
            Value::List(vec![
                Value::Int(1),
                Value::Placeholder(Placeholder::Element),
                Value::Placeholder(Placeholder::Element),
            ])
        );
    }

    #[test]
    fn test_idempotent() {
        let parsed = parse("x = {'a': [1, 2.5, {'b': None}], 'c': call()}\n");
        let reconstructor = Reconstructor::new(&parsed.source);
        let node = rhs(&parsed);
        assert_eq!(reconstructor.reconstruct(node), reconstructor.reconstruct(node));
    }

    #[test]
    fn test_total_over_every_node() {
        let source = "x = {'a': [1, (2, {3})], **other, 'f': f'{y}', 'g': -2.5, 'h': b'q' 'r'}\n";
        let parsed = parse(source);
        let reconstructor = Reconstructor::new(&parsed.source);
        let mut stack = vec![parsed.root()];
        while let Some(node) = stack.pop() {
            let _ = reconstructor.reconstruct(node);
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }
    }

    #[test]
    fn test_error_nodes_yield_placeholders() {
        let parsed = parse("x = [1, 2\ny = )\n");
        assert!(parsed.root().has_error());
        let mut stack = vec![parsed.root()];
        let mut damaged = None;
        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                damaged = Some(node);
                break;
            }
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }
        let node = damaged.expect("tree should contain an error or missing node");
        let value = Reconstructor::new(&parsed.source).reconstruct(node);
        assert!(value.is_placeholder(), "got {:?}", value);
    }
}

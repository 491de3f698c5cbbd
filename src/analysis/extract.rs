//! Class metadata extraction.
//!
//! [`ClassExtractor`] turns one `class_definition` node into a
//! [`ClassRecord`]. Every sub-field is extracted on its own: a failure is
//! logged, appended to `parsing_errors` and replaced with a placeholder,
//! and extraction moves on to the next field.

use std::fmt;

use tracing::error;
use tree_sitter::Node;

use super::literal::{self, LiteralError, StringLiteral};
use super::reconstruct::{ReconstructError, Reconstructor};
use super::records::{
    ArgumentRecord, ArgumentsBundle, AttributeValue, ClassRecord, DefaultRecord, MethodRecord,
};
use super::render::{render, RenderError};
use super::value::{Placeholder, Value};

/// Failures that leave no class to attach a record to.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("expected a class definition, found `{kind}` at line {line}")]
    NotAClass { kind: &'static str, line: usize },
    #[error("class definition at line {line} has no readable name")]
    MissingName { line: usize },
}

/// Why one sub-field could not be extracted.
#[derive(Debug, thiserror::Error)]
enum FieldError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),
    #[error(transparent)]
    Literal(#[from] LiteralError),
    #[error("`{kind}` at line {line} has no {part}")]
    Incomplete {
        kind: &'static str,
        part: &'static str,
        line: usize,
    },
    #[error("unexpected `{kind}` at line {line}")]
    Unexpected { kind: &'static str, line: usize },
}

impl FieldError {
    fn incomplete(node: Node, part: &'static str) -> Self {
        FieldError::Incomplete {
            kind: node.kind(),
            part,
            line: node.start_position().row + 1,
        }
    }
}

/// Sub-field of a class record, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Base,
    Docstring,
    Decorator,
    Attribute,
    Annotation,
    Arguments,
    Argument,
    ArgumentAnnotation,
    Default,
    KwDefault,
    ReturnType,
    Vararg,
    Kwarg,
    Body,
    Item,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Base => "Base class",
            Field::Docstring => "Docstring",
            Field::Decorator => "Decorator",
            Field::Attribute => "Attribute value",
            Field::Annotation => "Annotation",
            Field::Arguments => "Arguments",
            Field::Argument => "Argument",
            Field::ArgumentAnnotation => "Argument annotation",
            Field::Default => "Default value",
            Field::KwDefault => "Keyword default",
            Field::ReturnType => "Return type",
            Field::Vararg => "Vararg",
            Field::Kwarg => "Kwarg",
            Field::Body => "Body",
            Field::Item => "Item",
        })
    }
}

/// Accumulates sub-field failures for one class.
struct ErrorLog<'a> {
    class: &'a str,
    messages: Vec<String>,
}

impl<'a> ErrorLog<'a> {
    fn new(class: &'a str) -> Self {
        Self {
            class,
            messages: Vec::new(),
        }
    }

    fn record(&mut self, field: Field, item: &str, err: &FieldError) {
        let message = format!("{} error in {}: {}", field, item, err);
        error!(class = self.class, field = %field, item, "{}", message);
        self.messages.push(message);
    }
}

/// Extracts [`ClassRecord`]s from class definitions of one source file.
#[derive(Debug, Clone, Copy)]
pub struct ClassExtractor<'s> {
    reconstructor: Reconstructor<'s>,
}

impl<'s> ClassExtractor<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            reconstructor: Reconstructor::new(source),
        }
    }

    /// Use a preconfigured reconstructor (e.g. with a custom depth limit).
    pub fn with_reconstructor(reconstructor: Reconstructor<'s>) -> Self {
        Self { reconstructor }
    }

    fn source(&self) -> &'s str {
        self.reconstructor.source()
    }

    /// Extract one class.
    ///
    /// Fails only when `node` is not a named class definition. Otherwise a
    /// record is returned, with sub-field failures in `parsing_errors`.
    pub fn extract(&self, node: Node) -> Result<ClassRecord, ExtractError> {
        let line = node.start_position().row + 1;
        if node.kind() != "class_definition" {
            return Err(ExtractError::NotAClass {
                kind: node.kind(),
                line,
            });
        }
        let name = node
            .child_by_field_name("name")
            .and_then(|n| render(n, self.source()).ok())
            .ok_or(ExtractError::MissingName { line })?;

        let mut record = ClassRecord::new(name.as_str());
        let mut log = ErrorLog::new(&name);
        let item = format!("class {}", name);

        record.bases = self.bases(node, &mut log, &item);
        record.decorators = self.decorators(node, &mut log, &item);
        match node.child_by_field_name("body") {
            Some(body) => {
                record.docstring = self.docstring(body).unwrap_or_else(|e| {
                    log.record(Field::Docstring, &item, &e);
                    None
                });
                self.body(body, &mut record, &mut log);
            }
            None => log.record(Field::Body, &item, &FieldError::incomplete(node, "body")),
        }

        record.parsing_errors = log.messages;
        Ok(record)
    }

    fn bases(&self, class: Node, log: &mut ErrorLog, item: &str) -> Vec<String> {
        let Some(list) = class.child_by_field_name("superclasses") else {
            return Vec::new();
        };
        let mut bases = Vec::new();
        let mut cursor = list.walk();
        for base in list.named_children(&mut cursor) {
            if matches!(base.kind(), "keyword_argument" | "dictionary_splat" | "comment") {
                continue;
            }
            match render(base, self.source()) {
                Ok(text) => bases.push(text),
                Err(e) => log.record(Field::Base, item, &e.into()),
            }
        }
        bases
    }

    /// Decorators of a class or function, taken from the enclosing
    /// `decorated_definition`.
    fn decorators(&self, definition: Node, log: &mut ErrorLog, item: &str) -> Vec<String> {
        let Some(parent) = definition.parent().filter(|p| p.kind() == "decorated_definition")
        else {
            return Vec::new();
        };
        let mut decorators = Vec::new();
        let mut cursor = parent.walk();
        for decorator in parent.named_children(&mut cursor) {
            if decorator.kind() != "decorator" {
                continue;
            }
            let rendered = first_named(decorator)
                .ok_or_else(|| FieldError::incomplete(decorator, "expression"))
                .and_then(|expr| render(expr, self.source()).map_err(FieldError::from));
            match rendered {
                Ok(text) => decorators.push(text),
                Err(e) => {
                    log.record(Field::Decorator, item, &e);
                    decorators.push(Placeholder::Decorator.to_string());
                }
            }
        }
        decorators
    }

    /// Leading string literal of a body, cleaned like `inspect.cleandoc`.
    ///
    /// Bytes and f-strings are not docstrings.
    fn docstring(&self, body: Node) -> Result<Option<String>, FieldError> {
        let Some(first) = first_named(body) else {
            return Ok(None);
        };
        if first.kind() != "expression_statement" || first.named_child_count() != 1 {
            return Ok(None);
        }
        let Some(expr) = first.named_child(0) else {
            return Ok(None);
        };
        if !matches!(expr.kind(), "string" | "concatenated_string") {
            return Ok(None);
        }
        match literal::decode_string(expr, self.source()) {
            Ok(StringLiteral::Str(doc)) => Ok(Some(literal::clean_docstring(&doc))),
            Ok(StringLiteral::Bytes(_)) | Err(LiteralError::Formatted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn body(&self, body: Node, record: &mut ClassRecord, log: &mut ErrorLog) {
        let mut cursor = body.walk();
        for stmt in body.named_children(&mut cursor) {
            match stmt.kind() {
                "expression_statement" => {
                    if let Some(assignment) =
                        first_named(stmt).filter(|n| n.kind() == "assignment")
                    {
                        self.assignment(assignment, record, log);
                    }
                }
                "function_definition" => self.push_method(stmt, record, log),
                "decorated_definition" => {
                    if let Some(def) = stmt
                        .child_by_field_name("definition")
                        .filter(|d| d.kind() == "function_definition")
                    {
                        self.push_method(def, record, log);
                    }
                }
                "ERROR" => {
                    let item = format!("class {}", record.name);
                    log.record(
                        Field::Item,
                        &item,
                        &FieldError::Unexpected {
                            kind: stmt.kind(),
                            line: stmt.start_position().row + 1,
                        },
                    );
                }
                _ => {}
            }
        }
    }

    fn assignment(&self, node: Node, record: &mut ClassRecord, log: &mut ErrorLog) {
        // `a = b = v` nests: assignment(a, assignment(b, v)).
        let mut targets = Vec::new();
        let mut current = node;
        let value = loop {
            if let Some(left) = current.child_by_field_name("left") {
                targets.push(left);
            }
            match current.child_by_field_name("right") {
                Some(right) if right.kind() == "assignment" => current = right,
                right => break right,
            }
        };
        let Some(value) = value else {
            return;
        };
        let names: Vec<&str> = targets
            .iter()
            .filter(|t| t.kind() == "identifier")
            .filter_map(|t| t.utf8_text(self.source().as_bytes()).ok())
            .collect();
        let Some(&first) = names.first() else {
            return;
        };

        let item = format!("attribute {}", first);
        let value = self.attribute_value(value, log, &item);
        match node.child_by_field_name("type") {
            Some(annotation) => {
                let type_ = render(annotation, self.source()).unwrap_or_else(|e| {
                    log.record(Field::Annotation, &item, &e.into());
                    Placeholder::Annotation.to_string()
                });
                record
                    .attributes
                    .insert(first.to_string(), AttributeValue::Annotated { value, type_ });
            }
            None => {
                for name in names {
                    record
                        .attributes
                        .insert(name.to_string(), AttributeValue::Plain(value.clone()));
                }
            }
        }
    }

    fn attribute_value(&self, node: Node, log: &mut ErrorLog, item: &str) -> Value {
        self.reconstructor.try_reconstruct(node).unwrap_or_else(|e| {
            log.record(Field::Attribute, item, &e.into());
            Value::Placeholder(Placeholder::Error)
        })
    }

    fn push_method(&self, func: Node, record: &mut ClassRecord, log: &mut ErrorLog) {
        match func
            .child_by_field_name("name")
            .ok_or_else(|| FieldError::incomplete(func, "name"))
            .and_then(|n| render(n, self.source()).map_err(FieldError::from))
        {
            Ok(name) => {
                let method = self.method(func, name, log);
                record.methods.push(method);
            }
            Err(e) => {
                let item = format!("class {}", record.name);
                log.record(Field::Item, &item, &e);
            }
        }
    }

    fn method(&self, func: Node, name: String, log: &mut ErrorLog) -> MethodRecord {
        let item = format!("method {}", name);
        let decorators = self.decorators(func, log, &item);
        let docstring = match func.child_by_field_name("body") {
            Some(body) => self.docstring(body).unwrap_or_else(|e| {
                log.record(Field::Docstring, &item, &e);
                Some(Placeholder::Docstring.to_string())
            }),
            None => None,
        };
        let args = match func.child_by_field_name("parameters") {
            Some(params) => self.arguments(params, &name, log),
            None => {
                log.record(
                    Field::Arguments,
                    &item,
                    &FieldError::incomplete(func, "parameter list"),
                );
                ArgumentsBundle::default()
            }
        };
        let return_type = func.child_by_field_name("return_type").map(|ret| {
            render(ret, self.source()).unwrap_or_else(|e| {
                log.record(Field::ReturnType, &item, &e.into());
                Placeholder::ReturnType.to_string()
            })
        });

        MethodRecord {
            name,
            decorators,
            docstring,
            args,
            return_type,
        }
    }

    /// Walk a `parameters` node left to right.
    ///
    /// Parameters after `*` or `*args` are keyword-only. Positional
    /// defaults are collected in order and aligned to the trailing
    /// positional parameters.
    fn arguments(&self, params: Node, method: &str, log: &mut ErrorLog) -> ArgumentsBundle {
        let mut bundle = ArgumentsBundle::default();
        let mut keyword_only = false;
        let mut positional_defaults: Vec<Node> = Vec::new();

        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            match param.kind() {
                "comment" | "positional_separator" => {}
                "keyword_separator" => keyword_only = true,
                "list_splat_pattern" => {
                    bundle.vararg = Some(self.splat_name(param, Field::Vararg, method, log));
                    keyword_only = true;
                }
                "dictionary_splat_pattern" => {
                    bundle.kwarg = Some(self.splat_name(param, Field::Kwarg, method, log));
                }
                "typed_parameter" => match first_named(param) {
                    Some(inner) if inner.kind() == "list_splat_pattern" => {
                        bundle.vararg = Some(self.splat_name(inner, Field::Vararg, method, log));
                        keyword_only = true;
                    }
                    Some(inner) if inner.kind() == "dictionary_splat_pattern" => {
                        bundle.kwarg = Some(self.splat_name(inner, Field::Kwarg, method, log));
                    }
                    inner => {
                        let record = self.argument(param, inner, method, log);
                        push_argument(&mut bundle, record, keyword_only);
                    }
                },
                "identifier" | "default_parameter" | "typed_default_parameter" => {
                    let name_node = if param.kind() == "identifier" {
                        Some(param)
                    } else {
                        param.child_by_field_name("name")
                    };
                    let record = self.argument(param, name_node, method, log);
                    let default = param.child_by_field_name("value");
                    if keyword_only {
                        let value = default.map(|d| {
                            self.default_value(d, Field::KwDefault, method, &record.name, log)
                        });
                        bundle.kwonly_args.push(record);
                        bundle.kwonly_defaults.push(value);
                    } else {
                        if let Some(d) = default {
                            positional_defaults.push(d);
                        }
                        bundle.args.push(record);
                    }
                }
                _ => {
                    let item = format!("method {}", method);
                    log.record(
                        Field::Argument,
                        &item,
                        &FieldError::Unexpected {
                            kind: param.kind(),
                            line: param.start_position().row + 1,
                        },
                    );
                }
            }
        }

        let start = bundle.args.len().saturating_sub(positional_defaults.len());
        for (i, default) in positional_defaults.into_iter().enumerate() {
            let Some(arg) = bundle.args.get(start + i).map(|a| a.name.clone()) else {
                break;
            };
            let value = self.default_value(default, Field::Default, method, &arg, log);
            bundle.defaults.push(DefaultRecord { arg, value });
        }
        bundle
    }

    /// Name and annotation of one parameter; `name` is the node holding
    /// the identifier, which may be `param` itself.
    fn argument(
        &self,
        param: Node,
        name: Option<Node>,
        method: &str,
        log: &mut ErrorLog,
    ) -> ArgumentRecord {
        let rendered = name
            .ok_or_else(|| FieldError::incomplete(param, "name"))
            .and_then(|n| render(n, self.source()).map_err(FieldError::from));
        let name = rendered.unwrap_or_else(|e| {
            log.record(Field::Argument, &format!("method {}", method), &e);
            Placeholder::Argument.to_string()
        });
        let annotation = param.child_by_field_name("type").map(|ann| {
            render(ann, self.source()).unwrap_or_else(|e| {
                let item = format!("argument {}.{}", method, name);
                log.record(Field::ArgumentAnnotation, &item, &e.into());
                Placeholder::Annotation.to_string()
            })
        });
        ArgumentRecord { name, annotation }
    }

    fn default_value(
        &self,
        node: Node,
        field: Field,
        method: &str,
        arg: &str,
        log: &mut ErrorLog,
    ) -> Value {
        self.reconstructor.try_reconstruct(node).unwrap_or_else(|e| {
            let item = format!("argument {}.{}", method, arg);
            log.record(field, &item, &e.into());
            Value::Placeholder(if field == Field::KwDefault {
                Placeholder::KwDefault
            } else {
                Placeholder::Default
            })
        })
    }

    /// Name behind `*args` / `**kwargs`.
    fn splat_name(&self, splat: Node, field: Field, method: &str, log: &mut ErrorLog) -> String {
        let name = first_named(splat)
            .filter(|n| n.kind() == "identifier")
            .ok_or_else(|| FieldError::incomplete(splat, "name"))
            .and_then(|n| render(n, self.source()).map_err(FieldError::from));
        name.unwrap_or_else(|e| {
            log.record(field, &format!("method {}", method), &e);
            if field == Field::Kwarg {
                Placeholder::Kwarg.to_string()
            } else {
                Placeholder::Vararg.to_string()
            }
        })
    }
}

fn push_argument(bundle: &mut ArgumentsBundle, record: ArgumentRecord, keyword_only: bool) {
    if keyword_only {
        bundle.kwonly_args.push(record);
        bundle.kwonly_defaults.push(None);
    } else {
        bundle.args.push(record);
    }
}

/// First named child that is not a comment.
fn first_named(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    found
}

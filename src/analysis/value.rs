//! In-memory representation of reconstructed literal values.
//!
//! A [`Value`] is what the reconstructor produces for one expression node.
//! Scalars and containers mirror what the expression would evaluate to;
//! identifiers, unsupported expressions and failures are carried as
//! strings but keep their own variants so callers can tell them apart.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Sentinel strings substituted for values that could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// Reconstruction of a whole expression failed.
    Error,
    /// One element of a container failed; siblings are unaffected.
    Element,
    /// Source text of an unsupported expression could not be rendered.
    Unparse,
    Annotation,
    Decorator,
    Docstring,
    Argument,
    Default,
    KwDefault,
    ReturnType,
    Vararg,
    Kwarg,
}

impl Placeholder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placeholder::Error => "<error>",
            Placeholder::Element => "<parse_error>",
            Placeholder::Unparse => "<unparse_error>",
            Placeholder::Annotation => "<annotation_error>",
            Placeholder::Decorator => "<decorator_error>",
            Placeholder::Docstring => "<doc_error>",
            Placeholder::Argument => "<argument_error>",
            Placeholder::Default => "<default_parse_error>",
            Placeholder::KwDefault => "<kw_default_error>",
            Placeholder::ReturnType => "<return_type_error>",
            Placeholder::Vararg => "<vararg_error>",
            Placeholder::Kwarg => "<kwarg_error>",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reconstructed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    /// Fixed-arity sequence (a tuple literal).
    Tuple(Vec<Value>),
    /// Unique elements in first-seen order.
    Set(Vec<Value>),
    /// Insertion-ordered key/value pairs with unique keys.
    Dict(Vec<(Value, Value)>),
    /// A bare identifier, returned as its own name.
    Name(String),
    /// Source text of an expression that is not a literal.
    Expr(String),
    Placeholder(Placeholder),
}

impl Value {
    /// Build a set, dropping structurally equal duplicates.
    pub fn set_from(items: Vec<Value>) -> Self {
        let mut unique: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Value::Set(unique)
    }

    /// Build a mapping; a repeated key keeps its first position and takes
    /// the last value.
    pub fn dict_from(pairs: Vec<(Value, Value)>) -> Self {
        let mut out: Vec<(Value, Value)> = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            insert_pair(&mut out, key, value);
        }
        Value::Dict(out)
    }

    /// String content for every string-shaped variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Name(s) | Value::Expr(s) => Some(s.as_str()),
            Value::Placeholder(p) => Some(p.as_str()),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Dict(pairs) => Some(pairs.as_slice()),
            _ => None,
        }
    }

    /// Look up a string key in a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dict()?
            .iter()
            .find(|(k, _)| matches!(k, Value::Str(s) if s == key))
            .map(|(_, v)| v)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Value::Placeholder(_))
    }

    /// Python-style `repr` of the value.
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => float_repr(*f),
            Value::Str(s) => quote(s),
            Value::Bytes(b) => format!("b{}", quote(&String::from_utf8_lossy(b))),
            Value::List(items) => format!("[{}]", join_repr(items)),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!("({})", join_repr(items)),
            Value::Set(items) if items.is_empty() => "set()".to_string(),
            Value::Set(items) => format!("{{{}}}", join_repr(items)),
            Value::Dict(pairs) => {
                let inner: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Value::Name(s) | Value::Expr(s) => quote(s),
            Value::Placeholder(p) => quote(p.as_str()),
        }
    }

    /// Key text used when the value becomes a JSON object key.
    fn key_string(&self) -> String {
        match self {
            Value::Str(s) | Value::Name(s) | Value::Expr(s) => s.clone(),
            Value::Placeholder(p) => p.as_str().to_string(),
            Value::None => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            other => other.repr(),
        }
    }
}

fn insert_pair(pairs: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    match pairs.iter_mut().find(|(existing, _)| *existing == key) {
        Some(slot) => slot.1 = value,
        None => pairs.push((key, value)),
    }
}

fn join_repr(items: &[Value]) -> String {
    items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

fn float_repr(f: f64) -> String {
    if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{}inf", sign)
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

/// Displays like Python's `str()`: strings bare, everything else as `repr`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.write_str(s),
            None => f.write_str(&self.repr()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i128(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) | Value::Name(s) | Value::Expr(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
            Value::Placeholder(p) => serializer.serialize_str(p.as_str()),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Dict(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (k, v) in pairs {
                    map.serialize_entry(&k.key_string(), v)?;
                }
                map.end()
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i128> for Value {
    fn from(i: i128) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dict_last_write_wins() {
        let dict = Value::dict_from(vec![
            ("a".into(), 1.into()),
            ("b".into(), 2.into()),
            ("a".into(), 3.into()),
        ]);
        let pairs = dict.as_dict().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], ("a".into(), Value::Int(3)));
        assert_eq!(pairs[1].0, Value::from("b"));
    }

    #[test]
    fn test_set_drops_duplicates() {
        let set = Value::set_from(vec![1.into(), 2.into(), 1.into()]);
        assert_eq!(set, Value::Set(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_json_keys_are_stringified() {
        let dict = Value::dict_from(vec![
            (Value::Int(1), "one".into()),
            (Value::Bool(true), Value::None),
            (Value::None, Value::Float(0.5)),
        ]);
        let json = serde_json::to_value(&dict).unwrap();
        assert_eq!(json, serde_json::json!({"1": "one", "true": null, "null": 0.5}));
    }

    #[test]
    fn test_placeholders_serialize_as_tags() {
        let list = Value::List(vec![
            Value::Placeholder(Placeholder::Element),
            Value::Name("CONST".to_string()),
        ]);
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, r#"["<parse_error>","CONST"]"#);
    }

    #[test]
    fn test_repr_matches_python() {
        let value = Value::Dict(vec![(
            "options".into(),
            Value::List(vec!["bar".into(), "it's".into()]),
        )]);
        assert_eq!(value.repr(), r#"{'options': ['bar', "it's"]}"#);
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).repr(), "(1,)");
        assert_eq!(Value::Float(2.0).repr(), "2.0");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::from("plain").to_string(), "plain");
    }

    #[test]
    fn test_get_looks_up_string_keys() {
        let dict = Value::dict_from(vec![("type".into(), "number".into())]);
        assert_eq!(dict.get("type"), Some(&Value::from("number")));
        assert_eq!(dict.get("missing"), None);
        assert_eq!(Value::Int(1).get("type"), None);
    }
}

//! Record structures produced by class extraction.
//!
//! Field names are the JSON wire contract of a scan result.

use indexmap::IndexMap;
use serde::Serialize;

use super::value::Value;

/// A formal parameter and its annotation text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgumentRecord {
    pub name: String,
    pub annotation: Option<String>,
}

/// A positional default paired with the parameter it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefaultRecord {
    pub arg: String,
    pub value: Value,
}

/// Everything known about a method's parameter list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArgumentsBundle {
    /// Positional parameters, positional-only ones included, in order.
    pub args: Vec<ArgumentRecord>,
    /// Defaults for the trailing positional parameters.
    pub defaults: Vec<DefaultRecord>,
    pub kwonly_args: Vec<ArgumentRecord>,
    /// Aligned 1:1 with `kwonly_args`; `None` marks a required parameter.
    pub kwonly_defaults: Vec<Option<Value>>,
    pub vararg: Option<String>,
    pub kwarg: Option<String>,
}

impl ArgumentsBundle {
    /// The default recorded for a positional parameter, if any.
    pub fn default_for(&self, arg: &str) -> Option<&Value> {
        self.defaults.iter().find(|d| d.arg == arg).map(|d| &d.value)
    }

    /// Positional parameter names without a leading `self`/`cls`.
    pub fn explicit_args(&self) -> impl Iterator<Item = &ArgumentRecord> {
        self.args
            .iter()
            .enumerate()
            .filter(|(i, a)| !(*i == 0 && (a.name == "self" || a.name == "cls")))
            .map(|(_, a)| a)
    }
}

/// A method defined in a class body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodRecord {
    pub name: String,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
    pub args: ArgumentsBundle,
    pub return_type: Option<String>,
}

/// The value bound to a class attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// `name = value`
    Plain(Value),
    /// `name: type = value`
    Annotated {
        value: Value,
        #[serde(rename = "type")]
        type_: String,
    },
}

impl AttributeValue {
    pub fn value(&self) -> &Value {
        match self {
            AttributeValue::Plain(value) => value,
            AttributeValue::Annotated { value, .. } => value,
        }
    }

    pub fn annotation(&self) -> Option<&str> {
        match self {
            AttributeValue::Plain(_) => None,
            AttributeValue::Annotated { type_, .. } => Some(type_.as_str()),
        }
    }
}

/// Metadata for one class definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassRecord {
    pub name: String,
    pub bases: Vec<String>,
    pub docstring: Option<String>,
    pub attributes: IndexMap<String, AttributeValue>,
    pub methods: Vec<MethodRecord>,
    pub decorators: Vec<String>,
    /// Sub-field failures, in the order they were hit.
    pub parsing_errors: Vec<String>,
    /// Source path, attached once the class is placed in a file scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl ClassRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            docstring: None,
            attributes: IndexMap::new(),
            methods: Vec::new(),
            decorators: Vec::new(),
            parsing_errors: Vec::new(),
            file: None,
        }
    }

    /// Loose, name-based check: does any rendered base contain `marker`?
    ///
    /// `MyNodeBaseHelper` matches `NodeBase`. No type resolution happens.
    pub fn has_base_matching(&self, marker: &str) -> bool {
        self.bases.iter().any(|base| base.contains(marker))
    }

    pub fn method(&self, name: &str) -> Option<&MethodRecord> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotated_attribute_wire_shape() {
        let attr = AttributeValue::Annotated {
            value: Value::Int(3),
            type_: "int".to_string(),
        };
        let json = serde_json::to_value(&attr).unwrap();
        assert_eq!(json, serde_json::json!({"value": 3, "type": "int"}));

        let plain = AttributeValue::Plain(Value::from("x"));
        assert_eq!(serde_json::to_value(&plain).unwrap(), serde_json::json!("x"));
    }

    #[test]
    fn test_marker_match_is_substring() {
        let mut record = ClassRecord::new("Helper");
        record.bases.push("pkg.MyNodeBaseHelper".to_string());
        assert!(record.has_base_matching("NodeBase"));
        assert!(!record.has_base_matching("Widget"));
        assert!(!ClassRecord::new("Bare").has_base_matching("NodeBase"));
    }

    #[test]
    fn test_empty_bundle_serializes_all_keys() {
        let json = serde_json::to_value(ArgumentsBundle::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "args": [],
                "defaults": [],
                "kwonly_args": [],
                "kwonly_defaults": [],
                "vararg": null,
                "kwarg": null
            })
        );
    }

    #[test]
    fn test_explicit_args_skip_receiver() {
        let bundle = ArgumentsBundle {
            args: vec![
                ArgumentRecord { name: "self".into(), annotation: None },
                ArgumentRecord { name: "a".into(), annotation: Some("float".into()) },
            ],
            ..Default::default()
        };
        let names: Vec<&str> = bundle.explicit_args().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
    }
}

//! Output formatting for scan results.
//!
//! Supports two output formats:
//! - JSON: the structured scan document (`scanned_folders`, `files`,
//!   `classes`, `errors`)
//! - Pretty: classes grouped by file with their `params` listing, for
//!   reading in a terminal

use std::borrow::Cow;
use std::io::Write;

use colored::*;

use crate::analysis::{AttributeValue, Value};
use crate::scan::{ErrorEntry, ScanResult};

// =============================================================================
// JSON Format
// =============================================================================

/// Serialize a result as pretty-printed JSON (two-space indent).
pub fn to_json(result: &ScanResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

/// Write a result as JSON, followed by a newline.
pub fn write_json<W: Write>(result: &ScanResult, out: &mut W) -> anyhow::Result<()> {
    let json = to_json(result)?;
    writeln!(out, "{}", json)?;
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write classes grouped by file, then any errors.
///
/// For a class whose `params` attribute is a mapping, every parameter is
/// listed with the key/value pairs of its own mapping.
pub fn write_pretty<W: Write>(result: &ScanResult, out: &mut W, color: bool) -> anyhow::Result<()> {
    for (file, classes) in result.classes_by_file() {
        writeln!(out, "---\n{}\n---", paint(file, color, |s| s.blue()))?;
        for class in classes {
            writeln!(out, "--{}", paint(&class.name, color, |s| s.bold()))?;
            let Some(params) = class.attribute("params") else {
                continue;
            };
            write_params(out, &params_view(params), color)?;
        }
        writeln!(out)?;
    }

    if !result.errors.is_empty() {
        writeln!(
            out,
            "{}",
            paint("-- Errors encountered during parsing --", color, |s| s.red())
        )?;
        for entry in &result.errors {
            writeln!(out, "{}", entry_repr(entry))?;
        }
    }
    Ok(())
}

/// `params` the way it appears in the JSON document: an annotated
/// attribute is the `{value, type}` wrapper, not the bare value.
fn params_view(params: &AttributeValue) -> Cow<'_, Value> {
    match params {
        AttributeValue::Plain(value) => Cow::Borrowed(value),
        AttributeValue::Annotated { value, type_ } => Cow::Owned(Value::Dict(vec![
            ("value".into(), value.clone()),
            ("type".into(), Value::Str(type_.clone())),
        ])),
    }
}

/// Python-style mapping repr of an error entry, keys in document order.
fn entry_repr(entry: &ErrorEntry) -> String {
    let fields = [
        ("folder", entry.folder.as_ref()),
        ("file", entry.file.as_ref()),
        ("class", entry.class.as_ref()),
        ("error", Some(&entry.error)),
    ];
    let pairs = fields
        .into_iter()
        .filter_map(|(key, text)| text.map(|t| (Value::from(key), Value::Str(t.clone()))))
        .collect();
    Value::Dict(pairs).repr()
}

fn write_params<W: Write>(out: &mut W, params: &Value, color: bool) -> anyhow::Result<()> {
    let Some(pairs) = params.as_dict() else {
        return Ok(());
    };
    for (name, details) in pairs {
        writeln!(out, "    --{}--", paint(&name.to_string(), color, |s| s.cyan()))?;
        if let Some(entries) = details.as_dict() {
            for (key, value) in entries {
                writeln!(
                    out,
                    "        --{} | {}",
                    paint(&key.to_string(), color, |s| s.dimmed()),
                    value
                )?;
            }
        }
    }
    Ok(())
}

fn paint(text: &str, color: bool, style: impl FnOnce(&str) -> ColoredString) -> String {
    if color {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ClassRecord;
    use crate::scan::{ErrorEntry, ErrorKind};

    fn sample() -> ScanResult {
        let mut calc = ClassRecord::new("Calculator");
        calc.file = Some("nodes/calc.py".to_string());
        calc.attributes.insert(
            "params".to_string(),
            AttributeValue::Plain(Value::Dict(vec![(
                "a".into(),
                Value::Dict(vec![
                    ("type".into(), "number".into()),
                    ("default".into(), Value::Float(1.5)),
                ]),
            )])),
        );
        let mut bare = ClassRecord::new("Bare");
        bare.file = Some("nodes/calc.py".to_string());

        ScanResult {
            scanned_folders: vec!["nodes".to_string()],
            files: vec!["nodes/calc.py".to_string()],
            classes: vec![calc, bare],
            errors: vec![ErrorEntry::for_folder(
                "gone",
                ErrorKind::MissingRoot,
                "Folder does not exist: gone".to_string(),
            )],
        }
    }

    #[test]
    fn test_pretty_layout() {
        let mut out = Vec::new();
        write_pretty(&sample(), &mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = "\
---
nodes/calc.py
---
--Calculator
    --a--
        --type | number
        --default | 1.5
--Bare

-- Errors encountered during parsing --
{'folder': 'gone', 'error': 'Folder does not exist: gone'}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_pretty_annotated_params_show_wrapper() {
        let mut graph = ClassRecord::new("GraphData");
        graph.file = Some("nodes/graph.py".to_string());
        graph.attributes.insert(
            "params".to_string(),
            AttributeValue::Annotated {
                value: Value::Dict(vec![(
                    "x".into(),
                    Value::Dict(vec![("type".into(), "list".into())]),
                )]),
                type_: "dict".to_string(),
            },
        );
        let result = ScanResult {
            scanned_folders: vec!["nodes".to_string()],
            files: vec!["nodes/graph.py".to_string()],
            classes: vec![graph],
            errors: Vec::new(),
        };

        let mut out = Vec::new();
        write_pretty(&result, &mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = "\
---
nodes/graph.py
---
--GraphData
    --value--
        --x | {'type': 'list'}
    --type--

";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_error_entries_print_as_mappings() {
        let entry = ErrorEntry::for_class(
            "a.py",
            "Broken",
            "Error extracting class Broken in file a.py: it's bad".to_string(),
        );
        assert_eq!(
            entry_repr(&entry),
            "{'file': 'a.py', 'class': 'Broken', 'error': \"Error extracting class Broken in file a.py: it's bad\"}"
        );
    }

    #[test]
    fn test_json_document_keys() {
        let json = to_json(&sample()).unwrap();
        let positions: Vec<usize> = ["scanned_folders", "files", "classes", "errors"]
            .iter()
            .map(|key| json.find(&format!("\n  \"{}\"", key)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", json);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["classes"][0]["attributes"]["params"]["a"]["default"], 1.5);
        assert_eq!(value["classes"][1]["file"], "nodes/calc.py");
    }
}

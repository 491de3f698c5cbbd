//! Python literal decoding: strings, bytes, numbers and docstrings.

use tree_sitter::Node;

/// A decoded string or bytes literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringLiteral {
    Str(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiteralError {
    #[error("formatted string literals are expressions, not constants")]
    Formatted,
    #[error("named unicode escape `\\N{{{0}}}` cannot be resolved statically")]
    NamedEscape(String),
    #[error("cannot concatenate str and bytes literals")]
    MixedConcatenation,
    #[error("invalid escape sequence `{0}`")]
    InvalidEscape(String),
    #[error("malformed string literal")]
    Malformed,
}

impl LiteralError {
    /// Whether the literal is well formed but simply not a constant we can
    /// evaluate, so its source text is the right fallback.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            LiteralError::Formatted | LiteralError::NamedEscape(_) | LiteralError::MixedConcatenation
        )
    }
}

/// Decode a `string` or `concatenated_string` node.
pub fn decode_string(node: Node, source: &str) -> Result<StringLiteral, LiteralError> {
    match node.kind() {
        "string" => decode_single(node, source),
        "concatenated_string" => {
            let mut parts = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "comment" {
                    continue;
                }
                parts.push(decode_single(child, source)?);
            }
            concatenate(parts)
        }
        _ => Err(LiteralError::Malformed),
    }
}

fn concatenate(parts: Vec<StringLiteral>) -> Result<StringLiteral, LiteralError> {
    let mut iter = parts.into_iter();
    let first = iter.next().ok_or(LiteralError::Malformed)?;
    iter.try_fold(first, |acc, part| match (acc, part) {
        (StringLiteral::Str(mut a), StringLiteral::Str(b)) => {
            a.push_str(&b);
            Ok(StringLiteral::Str(a))
        }
        (StringLiteral::Bytes(mut a), StringLiteral::Bytes(b)) => {
            a.extend(b);
            Ok(StringLiteral::Bytes(a))
        }
        _ => Err(LiteralError::MixedConcatenation),
    })
}

fn decode_single(node: Node, source: &str) -> Result<StringLiteral, LiteralError> {
    if node.kind() != "string" {
        return Err(LiteralError::Malformed);
    }
    let count = node.child_count();
    let (start, end) = match (node.child(0), count.checked_sub(1).and_then(|i| node.child(i))) {
        (Some(s), Some(e)) if s.kind() == "string_start" && e.kind() == "string_end" => (s, e),
        _ => return Err(LiteralError::Malformed),
    };
    let opener = start
        .utf8_text(source.as_bytes())
        .map_err(|_| LiteralError::Malformed)?;
    let prefix: String = opener
        .trim_end_matches(['"', '\''])
        .to_ascii_lowercase();
    let content = source
        .get(start.end_byte()..end.start_byte())
        .ok_or(LiteralError::Malformed)?;

    if prefix.contains('f') || prefix.contains('t') {
        return Err(LiteralError::Formatted);
    }
    let raw = prefix.contains('r');
    if prefix.contains('b') {
        let bytes = if raw {
            content.as_bytes().to_vec()
        } else {
            unescape(content, true)?.into_bytes()
        };
        Ok(StringLiteral::Bytes(bytes))
    } else if raw {
        Ok(StringLiteral::Str(content.to_string()))
    } else {
        Ok(StringLiteral::Str(unescape(content, false)?.into_string()))
    }
}

/// Accumulates decoded output as either text or raw bytes.
struct Decoded {
    bytes: Vec<u8>,
}

impl Decoded {
    fn push_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Decode Python backslash escapes. `bytes_mode` disables `\u`, `\U` and
/// `\N`, which are ordinary characters in bytes literals.
fn unescape(content: &str, bytes_mode: bool) -> Result<Decoded, LiteralError> {
    let mut out = Decoded {
        bytes: Vec::with_capacity(content.len()),
    };
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push_char(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push_char('\\');
            break;
        };
        match next {
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\\' => out.push_char('\\'),
            '\'' => out.push_char('\''),
            '"' => out.push_char('"'),
            'a' => out.push_char('\x07'),
            'b' => out.push_char('\x08'),
            'f' => out.push_char('\x0c'),
            'n' => out.push_char('\n'),
            'r' => out.push_char('\r'),
            't' => out.push_char('\t'),
            'v' => out.push_char('\x0b'),
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                push_code(&mut out, value, bytes_mode, || format!("\\{:o}", value))?;
            }
            'x' => {
                let value = take_hex(&mut chars, 2).ok_or_else(|| LiteralError::InvalidEscape("\\x".to_string()))?;
                push_code(&mut out, value, bytes_mode, || format!("\\x{:02x}", value))?;
            }
            'u' if !bytes_mode => {
                let value = take_hex(&mut chars, 4).ok_or_else(|| LiteralError::InvalidEscape("\\u".to_string()))?;
                push_code(&mut out, value, false, || format!("\\u{:04x}", value))?;
            }
            'U' if !bytes_mode => {
                let value = take_hex(&mut chars, 8).ok_or_else(|| LiteralError::InvalidEscape("\\U".to_string()))?;
                push_code(&mut out, value, false, || format!("\\U{:08x}", value))?;
            }
            'N' if !bytes_mode => {
                let name: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|&c| c != '}').collect()
                } else {
                    String::new()
                };
                return Err(LiteralError::NamedEscape(name));
            }
            other => {
                out.push_char('\\');
                out.push_char(other);
            }
        }
    }
    Ok(out)
}

fn take_hex(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, digits: usize) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..digits {
        let d = chars.peek()?.to_digit(16)?;
        value = value.checked_mul(16)?.checked_add(d)?;
        chars.next();
    }
    Some(value)
}

fn push_code(
    out: &mut Decoded,
    value: u32,
    bytes_mode: bool,
    describe: impl FnOnce() -> String,
) -> Result<(), LiteralError> {
    if bytes_mode {
        let byte = u8::try_from(value).map_err(|_| LiteralError::InvalidEscape(describe()))?;
        out.bytes.push(byte);
    } else {
        let c = char::from_u32(value).ok_or_else(|| LiteralError::InvalidEscape(describe()))?;
        out.push_char(c);
    }
    Ok(())
}

/// First `\x`, `\u` or `\U` escape in a literal body that is too short or
/// out of range. `\u` and `\U` are plain text in bytes literals.
pub fn malformed_escape(content: &str, bytes: bool) -> Option<String> {
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            continue;
        }
        let Some(kind) = chars.next() else {
            break;
        };
        let digits = match kind {
            'x' => 2,
            'u' if !bytes => 4,
            'U' if !bytes => 8,
            _ => continue,
        };
        let value = take_hex(&mut chars, digits);
        if value.map_or(true, |v| kind == 'U' && v > 0x10FFFF) {
            return Some(format!("\\{}", kind));
        }
    }
    None
}

/// Decode an `integer` token. `None` for imaginary literals, legacy long
/// suffixes and values outside `i128`.
pub fn decode_integer(text: &str) -> Option<i128> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else {
        (lower.as_str(), 10)
    };
    i128::from_str_radix(digits, radix).ok()
}

/// Decode a `float` token. `None` for imaginary literals.
pub fn decode_float(text: &str) -> Option<f64> {
    if text.ends_with(['j', 'J']) {
        return None;
    }
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    cleaned.parse::<f64>().ok()
}

/// Normalise docstring indentation the way `inspect.cleandoc` does.
pub fn clean_docstring(doc: &str) -> String {
    let expanded: Vec<String> = doc.split('\n').map(expand_tabs).collect();

    let margin = expanded
        .iter()
        .skip(1)
        .filter_map(|line| {
            let content = line.trim_start();
            (!content.is_empty()).then(|| line.len() - content.len())
        })
        .min();

    let mut lines: Vec<String> = Vec::with_capacity(expanded.len());
    for (i, line) in expanded.into_iter().enumerate() {
        if i == 0 {
            lines.push(line.trim_start().to_string());
        } else {
            let cut = margin.unwrap_or(0).min(line.len());
            let stripped = line
                .get(cut..)
                .map(str::to_string)
                .unwrap_or_else(|| line.trim_start().to_string());
            lines.push(stripped);
        }
    }

    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let leading_blank = lines.iter().take_while(|l| l.trim().is_empty()).count();
    lines.drain(..leading_blank);
    lines.join("\n")
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let spaces = 8 - column % 8;
            out.extend(std::iter::repeat(' ').take(spaces));
            column += spaces;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parse_python;
    use std::path::Path;

    /// Decode the right-hand side of `x = <literal>`.
    fn decode(literal: &str) -> Result<StringLiteral, LiteralError> {
        let source = format!("x = {}\n", literal);
        let parsed = parse_python(Path::new("t.py"), source).unwrap();
        let right = parsed
            .root()
            .named_child(0)
            .and_then(|stmt| stmt.named_child(0))
            .and_then(|assign| assign.child_by_field_name("right"))
            .unwrap();
        decode_string(right, &parsed.source)
    }

    #[test]
    fn test_plain_and_escaped_strings() {
        assert_eq!(decode(r#""hello""#), Ok(StringLiteral::Str("hello".into())));
        assert_eq!(decode(r#"'a\tb\n'"#), Ok(StringLiteral::Str("a\tb\n".into())));
        assert_eq!(decode(r#""\x41é\101""#), Ok(StringLiteral::Str("AéA".into())));
        assert_eq!(decode(r#""\q""#), Ok(StringLiteral::Str("\\q".into())));
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(decode(r#"r"a\nb""#), Ok(StringLiteral::Str("a\\nb".into())));
        assert_eq!(decode(r#"b"\x00ab""#), Ok(StringLiteral::Bytes(vec![0, b'a', b'b'])));
        assert_eq!(decode(r#"u'x'"#), Ok(StringLiteral::Str("x".into())));
        assert_eq!(decode(r#"f"{x}""#), Err(LiteralError::Formatted));
    }

    #[test]
    fn test_triple_quoted_and_concatenated() {
        assert_eq!(
            decode("\"\"\"line one\nline two\"\"\""),
            Ok(StringLiteral::Str("line one\nline two".into()))
        );
        assert_eq!(decode(r#""ab" 'cd'"#), Ok(StringLiteral::Str("abcd".into())));
        assert_eq!(decode(r#""ab" b'cd'"#), Err(LiteralError::MixedConcatenation));
    }

    #[test]
    fn test_named_escape_is_unsupported() {
        let err = decode(r#""\N{BULLET}""#).unwrap_err();
        assert_eq!(err, LiteralError::NamedEscape("BULLET".into()));
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_malformed_escapes() {
        assert_eq!(malformed_escape(r"\x4", false), Some(r"\x".to_string()));
        assert_eq!(malformed_escape(r"ok \x41 \u00e9", false), None);
        assert_eq!(malformed_escape(r"\u12", false), Some(r"\u".to_string()));
        assert_eq!(malformed_escape(r"\U00110000", false), Some(r"\U".to_string()));
        assert_eq!(malformed_escape(r"\\x4", false), None);
        assert_eq!(malformed_escape(r"\ud800", false), None);
        assert_eq!(malformed_escape(r"\u12", true), None);
        assert_eq!(malformed_escape(r"\xZZ", true), Some(r"\x".to_string()));
    }

    #[test]
    fn test_integers() {
        assert_eq!(decode_integer("42"), Some(42));
        assert_eq!(decode_integer("1_000"), Some(1000));
        assert_eq!(decode_integer("0xFF"), Some(255));
        assert_eq!(decode_integer("0o17"), Some(15));
        assert_eq!(decode_integer("0b101"), Some(5));
        assert_eq!(decode_integer("0xFFFFFFFFFFFFFFFF"), Some(18_446_744_073_709_551_615));
        assert_eq!(decode_integer("99999999999999999999"), Some(99_999_999_999_999_999_999));
        assert_eq!(decode_integer(&format!("1{}", "0".repeat(40))), None);
        assert_eq!(decode_integer("3j"), None);
    }

    #[test]
    fn test_floats() {
        assert_eq!(decode_float("1.5"), Some(1.5));
        assert_eq!(decode_float("1e3"), Some(1000.0));
        assert_eq!(decode_float("1_0.5"), Some(10.5));
        assert_eq!(decode_float("2.5j"), None);
    }

    #[test]
    fn test_clean_docstring() {
        let doc = "Summary line.\n\n        Details here.\n          Indented more.\n    ";
        assert_eq!(
            clean_docstring(doc),
            "Summary line.\n\nDetails here.\n  Indented more."
        );
        assert_eq!(clean_docstring("  single  "), "single  ");
        assert_eq!(clean_docstring("\n    Leading blank.\n    "), "Leading blank.");
    }
}

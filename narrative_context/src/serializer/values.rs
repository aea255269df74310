//! Value rendering shared by both formats.

use serde_json::Value;

use world_bible::{is_empty_value, is_private_key, is_scalar, value_to_text};

/// Indentation of continuation lines in flat text.
pub const FLAT_INDENT: &str = "  ";

/// Parse a string holding an embedded JSON object or array.
///
/// Only strings starting with `{` or `[` are tried; scalars never count.
pub fn embedded_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
}

/// Whether a value renders on the same line as its label.
pub fn is_inline(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(is_scalar),
        Value::Object(_) => false,
        _ => true,
    }
}

/// Lines of a value in flat text, without indentation of the first level.
///
/// Multi-line strings keep their lines; lists of scalars join on one line;
/// maps render as `key: value` lines with nested values indented; lists of
/// maps render each element as a `- ` bullet.
pub fn value_lines(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => s.lines().map(|l| l.trim_end().to_string()).collect(),
        Value::Object(map) => {
            let mut lines = Vec::new();
            for (key, child) in map {
                if is_private_key(key) || is_empty_value(child) {
                    continue;
                }
                push_labeled(&mut lines, key, child);
            }
            lines
        }
        Value::Array(items) if !items.iter().all(is_scalar) => {
            let mut lines = Vec::new();
            for item in items.iter().filter(|v| !is_empty_value(v)) {
                let nested = value_lines(item);
                for (idx, line) in nested.into_iter().enumerate() {
                    if idx == 0 {
                        lines.push(format!("- {line}"));
                    } else {
                        lines.push(indent(&line));
                    }
                }
            }
            lines
        }
        other => {
            let text = value_to_text(other);
            if text.is_empty() {
                Vec::new()
            } else {
                vec![text]
            }
        }
    }
}

/// Append `label: value` to `lines`, indenting continuation lines.
pub fn push_labeled(lines: &mut Vec<String>, label: &str, value: &Value) {
    let body = value_lines(value);
    if is_inline(value) {
        let mut body = body.into_iter();
        let first = body.next().unwrap_or_default();
        lines.push(format!("{label}: {first}"));
        lines.extend(body.map(|l| indent(&l)));
    } else {
        lines.push(format!("{label}:"));
        lines.extend(body.into_iter().map(|l| indent(&l)));
    }
}

/// Indent a continuation line; blank lines stay empty.
fn indent(line: &str) -> String {
    if line.is_empty() {
        String::new()
    } else {
        format!("{FLAT_INDENT}{line}")
    }
}

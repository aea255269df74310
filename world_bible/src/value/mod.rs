//! Helpers over untyped entity records.
//!
//! Entities are arbitrary nested JSON documents. They are kept as
//! [`serde_json::Value`] and addressed with [`FieldPath`]s; every accessor
//! returns an `Option` instead of failing on absent data.

mod path;

pub use path::*;

use serde_json::Value;

/// Keys starting with this prefix are private bookkeeping and never
/// surface as content.
pub const PRIVATE_KEY_PREFIX: char = '_';

/// Whether a key is private/internal.
pub fn is_private_key(key: &str) -> bool {
    key.starts_with(PRIVATE_KEY_PREFIX)
}

/// Whether a value carries no content (null, blank string, empty list/map).
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_empty_value),
        Value::Object(map) => map
            .iter()
            .filter(|(k, _)| !is_private_key(k))
            .all(|(_, v)| is_empty_value(v)),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Render a value as single-block text.
///
/// Strings are returned as-is, scalars via their display form, lists of
/// scalars joined with `", "`. Nested structures fall back to compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.iter().all(is_scalar) => items
            .iter()
            .filter(|v| !is_empty_value(v))
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Whether a value is a string, number, bool or null.
pub fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Enumerate every leaf of a record with its dotted path, in document order.
///
/// Private keys are skipped. Lists of scalars count as a single leaf; lists
/// containing objects are walked with the element index as a segment.
pub fn leaf_paths(value: &Value) -> Vec<(FieldPath, &Value)> {
    let mut out = Vec::new();
    collect_leaves(value, &FieldPath::new(""), &mut out);
    out
}

fn collect_leaves<'a>(value: &'a Value, prefix: &FieldPath, out: &mut Vec<(FieldPath, &'a Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if is_private_key(key) {
                    continue;
                }
                collect_leaves(child, &prefix.child(key), out);
            }
        }
        Value::Array(items) if items.iter().any(|v| v.is_object()) => {
            for (idx, child) in items.iter().enumerate() {
                collect_leaves(child, &prefix.child(&idx.to_string()), out);
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.push((prefix.clone(), leaf));
            }
        }
    }
}

/// Top-level, non-private keys of a record in document order.
pub fn top_level_keys(value: &Value) -> Vec<&str> {
    value
        .as_object()
        .map(|map| {
            map.keys()
                .filter(|k| !is_private_key(k))
                .map(String::as_str)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_values() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!("   ")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({"_internal": "x"})));
        assert!(is_empty_value(&json!(["", null])));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!({"a": "b"})));
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!("Aria")), "Aria");
        assert_eq!(value_to_text(&json!(42)), "42");
        assert_eq!(value_to_text(&json!(["Dague", "", "Cape"])), "Dague, Cape");
        assert_eq!(value_to_text(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_leaf_paths_in_document_order() {
        let record = json!({
            "Nom": "Aria",
            "_id": "skip-me",
            "Background": { "Relations": "Bob", "Origine": "Nord" },
            "Tags": ["brave", "loyale"],
            "Alliés": [{ "Nom": "Bob" }]
        });

        let paths: Vec<String> = leaf_paths(&record)
            .into_iter()
            .map(|(p, _)| p.to_string())
            .collect();

        assert_eq!(
            paths,
            vec![
                "Nom",
                "Background.Relations",
                "Background.Origine",
                "Tags",
                "Alliés.0.Nom"
            ]
        );
    }

    #[test]
    fn test_top_level_keys() {
        let record = json!({"Nom": "A", "_meta": 1, "Age": 3});
        assert_eq!(top_level_keys(&record), vec!["Nom", "Age"]);
        assert!(top_level_keys(&json!([1, 2])).is_empty());
    }
}

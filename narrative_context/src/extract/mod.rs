//! Value extraction at selected field paths.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::fields::FieldConfiguration;
use world_bible::{
    is_empty_value, is_private_key, resolve_path, resolve_with_fallback, value_to_text, Entity,
    FieldPath,
};

/// Appended to values cut by a per-field character limit.
pub const FIELD_ELLIPSIS: &str = "...";

/// A labeled value pulled out of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub path: FieldPath,
    pub label: String,
    pub value: Value,
}

impl ExtractedField {
    /// Create a field.
    pub fn new(path: impl Into<FieldPath>, label: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            value,
        }
    }

    /// Single-block text of the value.
    pub fn text(&self) -> String {
        value_to_text(&self.value)
    }
}

/// Pulls labeled values out of an entity, applying descriptor rules.
///
/// For each path: skipped when `condition_path_not_exists` resolves to
/// content; resolved with the descriptor's fallback; skipped when absent or
/// empty; cut to the descriptor's character limit.
#[derive(Debug, Clone, Copy)]
pub struct FieldExtractor<'a> {
    config: &'a FieldConfiguration,
}

impl<'a> FieldExtractor<'a> {
    /// Create an extractor over a configuration.
    pub fn new(config: &'a FieldConfiguration) -> Self {
        Self { config }
    }

    /// Extract every path that yields content, in path order.
    pub fn extract(&self, element_type: &str, entity: &Entity, paths: &[FieldPath]) -> Vec<ExtractedField> {
        paths
            .iter()
            .filter_map(|path| self.extract_one(element_type, entity, path))
            .collect()
    }

    /// Extract one path.
    pub fn extract_one(&self, element_type: &str, entity: &Entity, path: &FieldPath) -> Option<ExtractedField> {
        if path.segments().any(is_private_key) {
            return None;
        }
        let descriptor = self.config.descriptor_for(element_type, path);

        if let Some(blocker) = descriptor.and_then(|d| d.condition_path_not_exists.as_ref()) {
            if resolve_path(entity, blocker).is_some_and(|v| !is_empty_value(v)) {
                trace!(path = %path, blocker = %blocker, "Field skipped, blocking path present");
                return None;
            }
        }

        let fallback = descriptor.and_then(|d| d.fallback_path.as_ref());
        let value = resolve_with_fallback(entity, path, fallback)?;
        if is_empty_value(value) {
            return None;
        }

        let value = match descriptor.and_then(|d| d.char_limit()) {
            Some(limit) => limit_chars(value, limit),
            None => value.clone(),
        };

        Some(ExtractedField {
            path: path.clone(),
            label: self.config.label_for(element_type, path),
            value,
        })
    }
}

/// Cut a value's text to `limit` characters, ending with an ellipsis.
///
/// Values already within the limit are returned unchanged.
pub fn limit_chars(value: &Value, limit: usize) -> Value {
    let text = value_to_text(value);
    if text.chars().count() <= limit {
        return value.clone();
    }
    let keep = limit.saturating_sub(FIELD_ELLIPSIS.chars().count());
    let head: String = text.chars().take(keep).collect();
    Value::String(format!("{}{}", head.trim_end(), FIELD_ELLIPSIS))
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::fields::{ConditionFlags, DetailMode};
use crate::organizer::OrganizationMode;
use crate::serializer::OutputFormat;
use world_bible::{normalize_name, FieldPath};

/// Requested entity names per category key, in request order.
///
/// Deserializes from a JSON object whose values are a name or a list of
/// names: `{"characters": ["Aria", "Bob"], "locations": "Port-Sable"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Selection {
    entries: Vec<(String, Vec<String>)>,
}

impl Selection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add names under a category key, merging with earlier entries of the
    /// same key.
    pub fn with<I, S>(mut self, key: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add(key, names);
        self
    }

    /// Add names under a category key.
    pub fn add<I, S>(&mut self, key: impl Into<String>, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = key.into();
        let names = names.into_iter().map(Into::into);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.extend(names),
            None => self.entries.push((key, names.collect())),
        }
    }

    /// Entries in request order.
    pub fn entries(&self) -> &[(String, Vec<String>)] {
        &self.entries
    }

    /// Names under a key.
    pub fn names(&self, key: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, names)| names.as_slice())
            .unwrap_or(&[])
    }

    /// Whether no name is requested.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, names)| names.is_empty())
    }
}

impl TryFrom<Map<String, Value>> for Selection {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut selection = Selection::new();
        for (key, value) in map {
            let names: Vec<String> = match value {
                Value::String(name) => vec![name],
                Value::Null => Vec::new(),
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(name) => Ok(name),
                        other => Err(format!("selection '{key}' holds a non-string name: {other}")),
                    })
                    .collect::<Result<_, _>>()?,
                other => return Err(format!("selection '{key}' must be a name or a list of names, got {other}")),
            };
            selection.add(key, names);
        }
        Ok(selection)
    }
}

impl From<Selection> for Map<String, Value> {
    fn from(selection: Selection) -> Self {
        selection
            .entries
            .into_iter()
            .map(|(key, names)| (key, Value::from(names)))
            .collect()
    }
}

/// Everything the context builder needs for one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextRequest {
    pub selection: Selection,
    pub organization: OrganizationMode,
    pub format: OutputFormat,
    /// Token budget of the rendered context; `None` means unlimited.
    pub max_tokens: Option<usize>,
    /// Detail mode per entity name; unlisted entities use `Full`.
    pub detail_modes: HashMap<String, DetailMode>,
    /// Field paths per element type, replacing the configured defaults.
    pub field_overrides: HashMap<String, Vec<FieldPath>>,
    /// Flags consulted by descriptor conditions.
    pub flags: ConditionFlags,
    /// Emit a numbered banner per entity (flat text only).
    pub include_item_markers: bool,
    /// Append linked entities in a secondary section.
    pub expand_links: bool,
}

impl Default for ContextRequest {
    fn default() -> Self {
        Self {
            selection: Selection::new(),
            organization: OrganizationMode::Default,
            format: OutputFormat::FlatText,
            max_tokens: None,
            detail_modes: HashMap::new(),
            field_overrides: HashMap::new(),
            flags: ConditionFlags::new(),
            include_item_markers: true,
            expand_links: false,
        }
    }
}

impl ContextRequest {
    /// Create a request for a selection.
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            ..Self::default()
        }
    }

    /// Set the organization mode.
    pub fn with_organization(mut self, mode: OrganizationMode) -> Self {
        self.organization = mode;
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the token budget.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the detail mode of one entity.
    pub fn with_detail_mode(mut self, name: impl AsRef<str>, mode: DetailMode) -> Self {
        self.detail_modes.insert(normalize_name(name.as_ref()), mode);
        self
    }

    /// Override the field paths of an element type.
    pub fn with_field_override<I, P>(mut self, element_type: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPath>,
    {
        self.field_overrides
            .insert(element_type.into(), paths.into_iter().map(Into::into).collect());
        self
    }

    /// Set a condition flag.
    pub fn with_flag(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.flags.insert(flag.into(), value);
        self
    }

    /// Toggle per-entity banners.
    pub fn with_item_markers(mut self, enabled: bool) -> Self {
        self.include_item_markers = enabled;
        self
    }

    /// Toggle linked-entity expansion.
    pub fn with_expand_links(mut self, enabled: bool) -> Self {
        self.expand_links = enabled;
        self
    }

    /// Detail mode of an entity.
    pub fn detail_mode(&self, name: &str) -> DetailMode {
        let normalized = normalize_name(name);
        self.detail_modes
            .iter()
            .find(|(key, _)| normalize_name(key) == normalized)
            .map(|(_, mode)| *mode)
            .unwrap_or_default()
    }

    /// Field override of an element type.
    pub fn field_override(&self, element_type: &str) -> Option<&[FieldPath]> {
        self.field_overrides
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(element_type))
            .map(|(_, paths)| paths.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selection_from_json() {
        let selection: Selection = serde_json::from_value(json!({
            "locations": "Port-Sable",
            "characters": ["Aria", "Bob"]
        }))
        .unwrap();
        assert_eq!(
            selection.entries(),
            &[
                ("locations".to_string(), vec!["Port-Sable".to_string()]),
                ("characters".to_string(), vec!["Aria".to_string(), "Bob".to_string()]),
            ]
        );
        assert_eq!(selection.names("characters").len(), 2);
        assert!(selection.names("items").is_empty());
    }

    #[test]
    fn test_selection_rejects_bad_shapes() {
        assert!(serde_json::from_value::<Selection>(json!({"characters": 3})).is_err());
        assert!(serde_json::from_value::<Selection>(json!({"characters": ["Aria", 1]})).is_err());
    }

    #[test]
    fn test_selection_roundtrip_keeps_order() {
        let selection = Selection::new().with("items", ["Dague"]).with("characters", ["Aria"]);
        let value = serde_json::to_value(&selection).unwrap();
        assert_eq!(value.to_string(), r#"{"items":["Dague"],"characters":["Aria"]}"#);
    }

    #[test]
    fn test_detail_mode_lookup_normalizes_names() {
        let request = ContextRequest::default().with_detail_mode("L’Ombre", DetailMode::Excerpt);
        assert_eq!(request.detail_mode("L'Ombre"), DetailMode::Excerpt);
        assert_eq!(request.detail_mode("Aria"), DetailMode::Full);
    }

    #[test]
    fn test_request_from_json_defaults() {
        let request: ContextRequest = serde_json::from_value(json!({
            "selection": {"characters": ["Aria"]},
            "organization": "narrative",
            "max_tokens": 500
        }))
        .unwrap();
        assert_eq!(request.organization, OrganizationMode::Narrative);
        assert_eq!(request.max_tokens, Some(500));
        assert!(request.include_item_markers);
        assert_eq!(request.format, OutputFormat::FlatText);
    }
}

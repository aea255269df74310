//! Field configuration: which dotted paths of each element type are worth
//! putting in front of the model, under which label and conditions.
//!
//! The configuration document is a JSON object keyed by lowercase element
//! type; each value is keyed by priority level (`"1"`, `"2"`, `"3"`) and
//! holds a list of field descriptors.

mod detector;
mod manager;
mod validator;

pub use detector::*;
pub use manager::*;
pub use validator::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, error, warn};

use world_bible::FieldPath;

/// Label markers selecting a descriptor for excerpt mode.
pub const EXCERPT_MARKERS: [&str; 2] = ["(extrait)", "(excerpt)"];

/// Descriptors with `truncate` at or below this limit count as essential.
pub const ESSENTIAL_TRUNCATE_LIMIT: i64 = 200;

/// Highest priority level used when none is requested.
pub const DEFAULT_PRIORITY_LEVEL: u8 = 3;

/// One configured field of an element type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Dotted path into the entity.
    pub path: FieldPath,

    /// Human label; may carry an excerpt marker.
    #[serde(default)]
    pub label: String,

    /// Include only when the caller sets this flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_flag: Option<String>,

    /// Include only when this path is absent from the entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_path_not_exists: Option<FieldPath>,

    /// Path tried when `path` is absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_path: Option<FieldPath>,

    /// Character limit for the rendered value; `-1` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncate: Option<i64>,
}

impl FieldDescriptor {
    /// Create a descriptor with a path and label.
    pub fn new(path: impl Into<FieldPath>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            condition_flag: None,
            condition_path_not_exists: None,
            fallback_path: None,
            truncate: None,
        }
    }

    /// Require a caller flag.
    pub fn with_condition_flag(mut self, flag: impl Into<String>) -> Self {
        self.condition_flag = Some(flag.into());
        self
    }

    /// Require a path to be absent.
    pub fn with_condition_path_not_exists(mut self, path: impl Into<FieldPath>) -> Self {
        self.condition_path_not_exists = Some(path.into());
        self
    }

    /// Set a fallback path.
    pub fn with_fallback(mut self, path: impl Into<FieldPath>) -> Self {
        self.fallback_path = Some(path.into());
        self
    }

    /// Set the character limit.
    pub fn with_truncate(mut self, limit: i64) -> Self {
        self.truncate = Some(limit);
        self
    }

    /// Whether the label marks this field as an excerpt variant.
    pub fn is_excerpt(&self) -> bool {
        let label = self.label.to_lowercase();
        EXCERPT_MARKERS.iter().any(|m| label.contains(m))
    }

    /// Whether minimality heuristics treat this field as essential.
    pub fn is_essential(&self) -> bool {
        matches!(self.truncate, Some(limit) if limit == -1 || (0..=ESSENTIAL_TRUNCATE_LIMIT).contains(&limit))
    }

    /// Positive character limit, if any.
    pub fn char_limit(&self) -> Option<usize> {
        self.truncate
            .filter(|limit| *limit > 0)
            .and_then(|limit| usize::try_from(limit).ok())
    }

    /// Label without excerpt markers, or a label derived from the path.
    pub fn display_label(&self) -> String {
        let mut label = self.label.clone();
        for marker in EXCERPT_MARKERS {
            if let Some(pos) = label.to_ascii_lowercase().find(marker) {
                label.replace_range(pos..pos + marker.len(), "");
            }
        }
        let label = label.trim();
        if label.is_empty() {
            label_from_path(&self.path)
        } else {
            label.to_string()
        }
    }
}

/// Derive a display label from a path: its segments joined with `" - "`.
pub fn label_from_path(path: &FieldPath) -> String {
    path.segments()
        .filter(|s| s.parse::<usize>().is_err())
        .collect::<Vec<_>>()
        .join(" - ")
}

/// Field configuration for every element type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldConfiguration {
    types: BTreeMap<String, BTreeMap<String, Vec<FieldDescriptor>>>,
}

impl FieldConfiguration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let parsed: FieldConfiguration = serde_json::from_str(json)?;
        Ok(parsed.normalized())
    }

    /// Load a configuration file.
    ///
    /// A missing or malformed file yields an empty configuration and a
    /// logged warning/error.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Field configuration not readable, using defaults");
                return Self::default();
            }
        };
        if raw.trim().is_empty() {
            warn!(path = %path.display(), "Field configuration is empty, using defaults");
            return Self::default();
        }
        match Self::from_json_str(&raw) {
            Ok(config) => {
                debug!(path = %path.display(), types = config.types.len(), "Field configuration loaded");
                config
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "Invalid field configuration, using defaults");
                Self::default()
            }
        }
    }

    /// Add a descriptor to a type at a priority level.
    pub fn with_descriptor(mut self, element_type: &str, level: u8, descriptor: FieldDescriptor) -> Self {
        self.types
            .entry(element_type.to_lowercase())
            .or_default()
            .entry(level.to_string())
            .or_default()
            .push(descriptor);
        self
    }

    fn normalized(self) -> Self {
        let mut types: BTreeMap<String, BTreeMap<String, Vec<FieldDescriptor>>> = BTreeMap::new();
        for (element_type, levels) in self.types {
            let entry = types.entry(element_type.trim().to_lowercase()).or_default();
            for (level, descriptors) in levels {
                entry.entry(level.trim().to_string()).or_default().extend(descriptors);
            }
        }
        Self { types }
    }

    /// Whether a type has any configured field.
    pub fn has_type(&self, element_type: &str) -> bool {
        self.types
            .get(&element_type.to_lowercase())
            .is_some_and(|levels| levels.values().any(|d| !d.is_empty()))
    }

    /// Configured element types.
    pub fn element_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Every descriptor of a type, lowest level first.
    pub fn descriptors(&self, element_type: &str) -> Vec<&FieldDescriptor> {
        self.descriptors_up_to(element_type, u8::MAX)
    }

    /// Descriptors of a type whose level is at most `max_level`.
    ///
    /// Levels that are not numbers sort last and are only included when
    /// `max_level` is `u8::MAX`.
    pub fn descriptors_up_to(&self, element_type: &str, max_level: u8) -> Vec<&FieldDescriptor> {
        let Some(levels) = self.types.get(&element_type.to_lowercase()) else {
            return Vec::new();
        };
        let mut ordered: Vec<(u8, &Vec<FieldDescriptor>)> = levels
            .iter()
            .map(|(level, d)| (level.parse::<u8>().unwrap_or(u8::MAX), d))
            .filter(|(level, _)| *level <= max_level)
            .collect();
        ordered.sort_by_key(|(level, _)| *level);
        ordered.into_iter().flat_map(|(_, d)| d.iter()).collect()
    }

    /// First descriptor of a type declaring `path`.
    pub fn descriptor_for(&self, element_type: &str, path: &FieldPath) -> Option<&FieldDescriptor> {
        self.descriptors(element_type)
            .into_iter()
            .find(|d| &d.path == path)
    }

    /// Display label for a path of a type.
    pub fn label_for(&self, element_type: &str, path: &FieldPath) -> String {
        self.descriptor_for(element_type, path)
            .map(FieldDescriptor::display_label)
            .unwrap_or_else(|| label_from_path(path))
    }

    /// Paths of a type whose descriptor counts as essential.
    pub fn essential_paths(&self, element_type: &str) -> Vec<&FieldPath> {
        self.descriptors(element_type)
            .into_iter()
            .filter(|d| d.is_essential())
            .map(|d| &d.path)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "Character": {
            "2": [
                {"path": "Background.Relations", "label": "Relations", "condition_flag": "include_relations"}
            ],
            "1": [
                {"path": "Nom", "label": "Nom", "truncate": -1},
                {"path": "Résumé", "label": "Résumé (extrait)", "fallback_path": "Description", "truncate": 150}
            ],
            "3": [
                {"path": "Notes", "label": "Notes", "truncate": 2000}
            ]
        },
        "location": { "1": [ {"path": "Nom", "label": "Nom"} ] }
    }"#;

    #[test]
    fn test_parse_and_level_order() {
        let config = FieldConfiguration::from_json_str(CONFIG).unwrap();
        let paths: Vec<&str> = config
            .descriptors("character")
            .iter()
            .map(|d| d.path.as_str())
            .collect();
        assert_eq!(paths, vec!["Nom", "Résumé", "Background.Relations", "Notes"]);

        let level_two: Vec<&str> = config
            .descriptors_up_to("CHARACTER", 2)
            .iter()
            .map(|d| d.path.as_str())
            .collect();
        assert_eq!(level_two, vec!["Nom", "Résumé", "Background.Relations"]);
    }

    #[test]
    fn test_excerpt_and_essential() {
        let config = FieldConfiguration::from_json_str(CONFIG).unwrap();
        let resume = config
            .descriptor_for("character", &FieldPath::new("Résumé"))
            .unwrap();
        assert!(resume.is_excerpt());
        assert!(resume.is_essential());
        assert_eq!(resume.display_label(), "Résumé");
        assert_eq!(resume.char_limit(), Some(150));

        let notes = config.descriptor_for("character", &FieldPath::new("Notes")).unwrap();
        assert!(!notes.is_essential());
        assert!(!notes.is_excerpt());

        let essentials: Vec<&str> = config
            .essential_paths("character")
            .iter()
            .map(|p| p.as_str())
            .collect();
        assert_eq!(essentials, vec!["Nom", "Résumé"]);
    }

    #[test]
    fn test_labels() {
        let config = FieldConfiguration::from_json_str(CONFIG).unwrap();
        assert_eq!(config.label_for("character", &FieldPath::new("Nom")), "Nom");
        assert_eq!(
            config.label_for("character", &FieldPath::new("Background.Origine")),
            "Background - Origine"
        );
        assert_eq!(label_from_path(&FieldPath::new("Alliés.0.Nom")), "Alliés - Nom");
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(FieldConfiguration::from_json_str("{\"character\": [").is_err());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let config = FieldConfiguration::load(Path::new("/definitely/not/here.json"));
        assert_eq!(config, FieldConfiguration::default());
        assert!(!config.has_type("character"));
    }

    #[test]
    fn test_builder() {
        let config = FieldConfiguration::new()
            .with_descriptor("Item", 1, FieldDescriptor::new("Nom", "Nom").with_truncate(-1));
        assert!(config.has_type("item"));
        assert_eq!(config.essential_paths("item").len(), 1);
    }
}

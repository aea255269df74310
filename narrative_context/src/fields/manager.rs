//! Chooses the field paths rendered for an entity.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{FieldConfiguration, FieldDescriptor, FieldValidator, DEFAULT_PRIORITY_LEVEL};
use crate::logging::LogThrottle;
use crate::throttled_info;
use world_bible::{is_private_key, Entity, FieldPath};

/// How much of an entity to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailMode {
    /// Every selected field.
    #[default]
    Full,
    /// Only fields whose label marks them as excerpt variants.
    Excerpt,
}

/// Caller flags consulted by descriptor conditions.
pub type ConditionFlags = HashMap<String, bool>;

/// Resolves which paths to include per element type and detail mode.
#[derive(Debug)]
pub struct FieldManager {
    config: Arc<FieldConfiguration>,
    validator: FieldValidator,
    priority_level: u8,
    throttle: LogThrottle,
}

impl FieldManager {
    /// Create a manager over a configuration.
    pub fn new(config: Arc<FieldConfiguration>) -> Self {
        Self {
            config,
            validator: FieldValidator::default(),
            priority_level: DEFAULT_PRIORITY_LEVEL,
            throttle: LogThrottle::default(),
        }
    }

    /// Set the highest priority level included by default.
    pub fn with_priority_level(mut self, level: u8) -> Self {
        self.priority_level = level.max(1);
        self
    }

    /// Replace the log throttle.
    pub fn with_throttle(mut self, throttle: LogThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &FieldConfiguration {
        &self.config
    }

    /// The validator in use.
    pub fn validator(&self) -> &FieldValidator {
        &self.validator
    }

    /// Resolve the paths for a type and mode.
    ///
    /// Full mode returns the override list unchanged (`None` means "use
    /// defaults"). Excerpt mode ignores overrides and collects every
    /// declared path whose label is an excerpt variant; `None` when the
    /// type has none.
    pub fn resolve_fields(
        &self,
        element_type: &str,
        mode: DetailMode,
        overrides: Option<&[FieldPath]>,
    ) -> Option<Vec<FieldPath>> {
        match mode {
            DetailMode::Full => overrides.map(<[FieldPath]>::to_vec),
            DetailMode::Excerpt => {
                let excerpt: Vec<FieldPath> = self
                    .config
                    .descriptors(element_type)
                    .into_iter()
                    .filter(|d| d.is_excerpt())
                    .map(|d| d.path.clone())
                    .collect();
                if excerpt.is_empty() {
                    debug!(element_type, "No excerpt fields declared, using defaults");
                    None
                } else {
                    Some(dedup_preserving_order(excerpt))
                }
            }
        }
    }

    /// Default paths of a type.
    ///
    /// Declared paths up to the configured priority level; for types
    /// without configuration, the entity's own observed paths.
    pub fn default_paths(&self, element_type: &str, entity: &Entity) -> Vec<FieldPath> {
        let declared: Vec<FieldPath> = self
            .config
            .descriptors_up_to(element_type, self.priority_level)
            .into_iter()
            .map(|d| d.path.clone())
            .collect();
        if declared.is_empty() {
            observed_field_paths(entity)
        } else {
            dedup_preserving_order(declared)
        }
    }

    /// Keep paths that exist in real data and whose conditions hold.
    ///
    /// Validation runs first against `sample` (entities of the same type);
    /// without data it is skipped and every path continues. Then any path
    /// whose descriptor requires a flag the caller did not set is dropped.
    pub fn filter_by_condition(
        &self,
        element_type: &str,
        paths: Vec<FieldPath>,
        flags: &ConditionFlags,
        sample: &[Entity],
    ) -> Vec<FieldPath> {
        let paths = match self.validator.validate(&paths, sample) {
            Some(report) => {
                if !report.invalid.is_empty() {
                    throttled_info!(
                        self.throttle,
                        &format!("invalid-paths:{element_type}"),
                        element_type,
                        dropped = report.invalid.len(),
                        "Dropped field paths absent from data"
                    );
                }
                report.valid
            }
            None => {
                debug!(element_type, "No data to validate field paths against, keeping all");
                paths
            }
        };

        paths
            .into_iter()
            .filter(|path| match self.config.descriptor_for(element_type, path) {
                Some(descriptor) => condition_satisfied(descriptor, flags),
                None => true,
            })
            .collect()
    }

    /// Descriptor declared for a path.
    pub fn descriptor_for(&self, element_type: &str, path: &FieldPath) -> Option<&FieldDescriptor> {
        self.config.descriptor_for(element_type, path)
    }
}

/// Whether a descriptor's flag condition is met.
pub fn condition_satisfied(descriptor: &FieldDescriptor, flags: &ConditionFlags) -> bool {
    match &descriptor.condition_flag {
        Some(flag) => flags.get(flag).copied().unwrap_or(false),
        None => true,
    }
}

/// Paths present in an entity, in document order.
///
/// Maps are descended into; lists and scalars are leaves. Private keys are
/// skipped.
pub fn observed_field_paths(entity: &Entity) -> Vec<FieldPath> {
    let mut out = Vec::new();
    collect_observed(entity, &FieldPath::new(""), &mut out);
    out
}

fn collect_observed(value: &Value, prefix: &FieldPath, out: &mut Vec<FieldPath>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                if is_private_key(key) {
                    continue;
                }
                collect_observed(child, &prefix.child(key), out);
            }
        }
        _ => {
            if !prefix.is_empty() {
                out.push(prefix.clone());
            }
        }
    }
}

fn dedup_preserving_order(paths: Vec<FieldPath>) -> Vec<FieldPath> {
    let mut seen = std::collections::HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

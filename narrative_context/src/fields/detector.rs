//! Field path discovery over real entity data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use world_bible::{is_private_key, Entity, FieldPath};

/// Default number of entities sampled per detection.
pub const DEFAULT_SAMPLE_SIZE: usize = 50;

/// Coarse kind of an observed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    Text,
    Number,
    Bool,
    List,
    Map,
    Null,
}

impl ValueKind {
    /// Kind of a JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => ValueKind::Text,
            Value::Number(_) => ValueKind::Number,
            Value::Bool(_) => ValueKind::Bool,
            Value::Array(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Map,
            Value::Null => ValueKind::Null,
        }
    }
}

/// Statistics for one observed path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub path: FieldPath,
    /// Number of sampled entities containing the path.
    pub occurrences: usize,
    /// `occurrences / sample size`.
    pub frequency: f32,
    /// Kinds of value seen at the path.
    pub kinds: BTreeSet<ValueKind>,
}

/// Every path observed across a sample of entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedFields {
    stats: BTreeMap<FieldPath, FieldStats>,
    sample_size: usize,
}

impl DetectedFields {
    /// Number of entities inspected.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Whether a path was observed. Numeric (list index) segments are
    /// ignored, so `Alliés.0.Nom` matches the observed `Alliés.Nom`.
    pub fn contains(&self, path: &FieldPath) -> bool {
        self.stats.contains_key(&without_indices(path))
    }

    /// Statistics of a path.
    pub fn get(&self, path: &FieldPath) -> Option<&FieldStats> {
        self.stats.get(&without_indices(path))
    }

    /// Every observed path, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.stats.keys()
    }

    /// Every statistic, sorted by path.
    pub fn iter(&self) -> impl Iterator<Item = &FieldStats> {
        self.stats.values()
    }

    /// Paths seen in at least `min_frequency` of the sample.
    pub fn common_paths(&self, min_frequency: f32) -> Vec<&FieldPath> {
        self.stats
            .values()
            .filter(|s| s.frequency >= min_frequency)
            .map(|s| &s.path)
            .collect()
    }

    /// Number of distinct paths.
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Whether nothing was observed.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

/// Builds [`DetectedFields`] from entities.
#[derive(Debug, Clone)]
pub struct FieldDetector {
    sample_size: usize,
}

impl FieldDetector {
    /// Create a detector inspecting at most `sample_size` entities.
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size: sample_size.max(1),
        }
    }

    /// Create a detector with the default sample size.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }

    /// Observe every path (intermediate maps included) of the first
    /// `sample_size` entities.
    ///
    /// Lists of maps contribute their elements' paths under the list path;
    /// private keys are skipped.
    pub fn detect(&self, entities: &[Entity]) -> DetectedFields {
        let sample = &entities[..entities.len().min(self.sample_size)];
        let mut stats: BTreeMap<FieldPath, FieldStats> = BTreeMap::new();

        for entity in sample {
            let mut seen: HashSet<FieldPath> = HashSet::new();
            let mut kinds: Vec<(FieldPath, ValueKind)> = Vec::new();
            walk(entity, &FieldPath::new(""), &mut seen, &mut kinds);

            for (path, kind) in kinds {
                stats
                    .entry(path.clone())
                    .or_insert_with(|| FieldStats {
                        path,
                        occurrences: 0,
                        frequency: 0.0,
                        kinds: BTreeSet::new(),
                    })
                    .kinds
                    .insert(kind);
            }
            for path in seen {
                if let Some(stat) = stats.get_mut(&path) {
                    stat.occurrences += 1;
                }
            }
        }

        let total = sample.len();
        for stat in stats.values_mut() {
            stat.frequency = if total == 0 {
                0.0
            } else {
                stat.occurrences as f32 / total as f32
            };
        }

        DetectedFields {
            stats,
            sample_size: total,
        }
    }
}

impl Default for FieldDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn walk(
    value: &Value,
    prefix: &FieldPath,
    seen: &mut HashSet<FieldPath>,
    kinds: &mut Vec<(FieldPath, ValueKind)>,
) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if is_private_key(key) {
                    continue;
                }
                let path = prefix.child(key);
                seen.insert(path.clone());
                kinds.push((path.clone(), ValueKind::of(child)));
                walk(child, &path, seen, kinds);
            }
        }
        Value::Array(items) => {
            for item in items.iter().filter(|v| v.is_object()) {
                walk(item, prefix, seen, kinds);
            }
        }
        _ => {}
    }
}

fn without_indices(path: &FieldPath) -> FieldPath {
    FieldPath::from_segments(path.segments().filter(|s| s.parse::<usize>().is_err()))
}

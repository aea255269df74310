//! Removal of redundant field paths before organization.
//!
//! Two passes: structural (drop ancestors of other selected paths) then
//! value-level (among paths rendering the same content, keep one).

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use world_bible::{is_empty_value, is_private_key, resolve_with_fallback, Entity, FieldPath};

/// Drop every path that is a strict ancestor of another requested path.
///
/// Exact repeats are collapsed to their first occurrence. Order is kept.
pub fn drop_ancestor_paths(paths: &[FieldPath]) -> Vec<FieldPath> {
    let mut seen = HashSet::new();
    paths
        .iter()
        .filter(|path| !paths.iter().any(|other| path.is_ancestor_of(other)))
        .filter(|path| seen.insert((*path).clone()))
        .cloned()
        .collect()
}

/// Keep one path per group of identical rendered values.
///
/// Values are compared case-insensitively for scalars and structurally for
/// lists and maps. Within a group the survivor is the path without dots,
/// then the shortest, then the lexicographically first. Paths that do not
/// resolve, or resolve to nothing, are never grouped.
pub fn dedupe_by_value(entity: &Entity, paths: &[FieldPath]) -> Vec<FieldPath> {
    dedupe_by_resolved_value(entity, paths, |_| None)
}

/// Value pass where each path resolves as extraction does, through the
/// fallback path returned by `fallback` when its own value is absent or
/// empty.
pub fn dedupe_by_resolved_value<'f, F>(entity: &Entity, paths: &[FieldPath], fallback: F) -> Vec<FieldPath>
where
    F: Fn(&FieldPath) -> Option<&'f FieldPath>,
{
    let mut groups: HashMap<String, Vec<&FieldPath>> = HashMap::new();
    for path in paths {
        if let Some(key) = value_key(entity, path, fallback(path)) {
            groups.entry(key).or_default().push(path);
        }
    }

    let losers: HashSet<&FieldPath> = groups
        .values()
        .filter(|group| group.len() > 1)
        .flat_map(|group| {
            let winner = group.iter().copied().min_by(|a, b| preference(a).cmp(&preference(b)));
            group.iter().copied().filter(move |p| Some(*p) != winner)
        })
        .collect();

    paths.iter().filter(|p| !losers.contains(p)).cloned().collect()
}

fn preference(path: &FieldPath) -> (bool, usize, &str) {
    (!path.is_direct(), path.as_str().chars().count(), path.as_str())
}

fn value_key(entity: &Entity, path: &FieldPath, fallback: Option<&FieldPath>) -> Option<String> {
    if path.segments().any(is_private_key) {
        return None;
    }
    let fallback = fallback.filter(|fb| !fb.segments().any(is_private_key));
    let value = resolve_with_fallback(entity, path, fallback)?;
    if is_empty_value(value) {
        return None;
    }
    Some(canonical(value))
}

/// Canonical comparison form of a value.
///
/// Strings are trimmed and lowercased; numbers and booleans use their
/// display form; maps are rendered with sorted keys and private keys
/// removed, so key order never matters.
pub fn canonical(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_lowercase(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, String)> = map
                .iter()
                .filter(|(k, _)| !is_private_key(k))
                .map(|(k, v)| (k, canonical(v)))
                .collect();
            entries.sort();
            let inner: Vec<String> = entries.into_iter().map(|(k, v)| format!("{k:?}:{v}")).collect();
            format!("{{{}}}", inner.join(","))
        }
    }
}

/// Runs both passes for one entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator;

impl Deduplicator {
    /// Create a deduplicator.
    pub fn new() -> Self {
        Self
    }

    /// Structural pass, then value pass.
    pub fn dedupe(&self, entity: &Entity, paths: &[FieldPath]) -> Vec<FieldPath> {
        self.dedupe_with_fallbacks(entity, paths, |_| None)
    }

    /// Structural pass, then value pass resolving through fallback paths.
    pub fn dedupe_with_fallbacks<'f, F>(&self, entity: &Entity, paths: &[FieldPath], fallback: F) -> Vec<FieldPath>
    where
        F: Fn(&FieldPath) -> Option<&'f FieldPath>,
    {
        let structural = drop_ancestor_paths(paths);
        let deduped = dedupe_by_resolved_value(entity, &structural, fallback);
        let removed = paths.len() - deduped.len();
        if removed > 0 {
            debug!(requested = paths.len(), removed, "Removed redundant field paths");
        }
        deduped
    }
}

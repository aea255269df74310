//! Dotted field paths into untyped entity records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator between the segments of a field path.
pub const PATH_SEPARATOR: char = '.';

/// A dot-delimited address into an entity (e.g. `Background.Relations`).
///
/// Paths are compared segment-wise, so `Background` is an ancestor of
/// `Background.Relations` but not of `BackgroundNotes`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(String);

impl FieldPath {
    /// Create a path from its dotted string form.
    ///
    /// Surrounding whitespace is trimmed and empty segments are dropped,
    /// so `" A..B "` becomes `A.B`.
    pub fn new(path: impl AsRef<str>) -> Self {
        let joined = path
            .as_ref()
            .split(PATH_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(".");
        Self(joined)
    }

    /// Build a path from individual segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts: Vec<String> = segments
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self(parts.join("."))
    }

    /// The dotted string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(PATH_SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Whether the path is a single top-level key.
    pub fn is_direct(&self) -> bool {
        !self.0.contains(PATH_SEPARATOR)
    }

    /// Whether the path is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The last segment, or the empty string for an empty path.
    pub fn leaf(&self) -> &str {
        self.0.rsplit(PATH_SEPARATOR).next().unwrap_or("")
    }

    /// The path without its last segment.
    pub fn parent(&self) -> Option<FieldPath> {
        self.0
            .rfind(PATH_SEPARATOR)
            .map(|idx| FieldPath(self.0[..idx].to_string()))
    }

    /// Append a segment.
    pub fn child(&self, segment: &str) -> FieldPath {
        if self.0.is_empty() {
            FieldPath::new(segment)
        } else {
            FieldPath::new(format!("{}.{}", self.0, segment))
        }
    }

    /// Whether `other` is a strict dotted-prefix extension of `self`.
    pub fn is_ancestor_of(&self, other: &FieldPath) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0[self.0.len()..].starts_with(PATH_SEPARATOR)
    }

    /// Resolve this path against a record.
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        resolve_path(value, self)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        FieldPath::new(s)
    }
}

impl From<String> for FieldPath {
    fn from(s: String) -> Self {
        FieldPath::new(s)
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Walk a record along `path`.
///
/// Object segments are looked up by key; array segments accept a numeric
/// index. Returns `None` on the first missing step, never panics.
pub fn resolve_path<'a>(value: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = value;
    for segment in path.segments() {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let idx: usize = segment.parse().ok()?;
                items.get(idx)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve `path`, retrying with `fallback` when the primary path is absent
/// or empty.
pub fn resolve_with_fallback<'a>(
    value: &'a Value,
    path: &FieldPath,
    fallback: Option<&FieldPath>,
) -> Option<&'a Value> {
    match resolve_path(value, path) {
        Some(found) if !super::is_empty_value(found) => Some(found),
        primary => fallback
            .and_then(|fb| resolve_path(value, fb))
            .filter(|v| !super::is_empty_value(v))
            .or(primary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_normalization() {
        let path = FieldPath::new(" Background..Relations ");
        assert_eq!(path.as_str(), "Background.Relations");
        assert_eq!(path.depth(), 2);
        assert_eq!(path.leaf(), "Relations");
        assert!(!path.is_direct());
    }

    #[test]
    fn test_ancestor_is_segment_wise() {
        let parent = FieldPath::new("Background");
        let child = FieldPath::new("Background.Relations");
        let sibling = FieldPath::new("BackgroundNotes");

        assert!(parent.is_ancestor_of(&child));
        assert!(!parent.is_ancestor_of(&sibling));
        assert!(!parent.is_ancestor_of(&parent));
        assert!(!child.is_ancestor_of(&parent));
    }

    #[test]
    fn test_parent_and_child() {
        let path = FieldPath::new("A.B.C");
        assert_eq!(path.parent(), Some(FieldPath::new("A.B")));
        assert_eq!(FieldPath::new("A").parent(), None);
        assert_eq!(FieldPath::new("A").child("B"), FieldPath::new("A.B"));
    }

    #[test]
    fn test_resolve_nested_and_indexed() {
        let record = json!({
            "Nom": "Aria",
            "Background": { "Relations": "Bob" },
            "Objets": ["Dague", "Cape"]
        });

        assert_eq!(
            FieldPath::new("Background.Relations").resolve(&record),
            Some(&json!("Bob"))
        );
        assert_eq!(FieldPath::new("Objets.1").resolve(&record), Some(&json!("Cape")));
        assert_eq!(FieldPath::new("Objets.7").resolve(&record), None);
        assert_eq!(FieldPath::new("Nom.Sub").resolve(&record), None);
        assert_eq!(FieldPath::new("").resolve(&record), None);
    }

    #[test]
    fn test_resolve_with_fallback() {
        let record = json!({ "Résumé": "", "Description": "Une guerrière" });
        let primary = FieldPath::new("Résumé");
        let fallback = FieldPath::new("Description");

        let found = resolve_with_fallback(&record, &primary, Some(&fallback));
        assert_eq!(found, Some(&json!("Une guerrière")));

        let missing = FieldPath::new("Absent");
        assert_eq!(resolve_with_fallback(&record, &missing, None), None);
        // Empty primary with no usable fallback still reports the empty value.
        assert_eq!(
            resolve_with_fallback(&record, &primary, Some(&missing)),
            Some(&json!(""))
        );
    }
}

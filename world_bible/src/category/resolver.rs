//! Category key resolution and display ordering.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::Category;

/// Preferred display order of selected categories.
pub const DISPLAY_PRIORITY: [Category; 6] = [
    Category::Characters,
    Category::Species,
    Category::Communities,
    Category::Locations,
    Category::Items,
    Category::Quests,
];

/// Lookup table from every accepted request key to its category.
///
/// Built once per process; each key maps to exactly one category and so to
/// exactly one element type and display label.
static KEY_TABLE: Lazy<HashMap<String, Category>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for category in Category::ALL {
        table.insert(category.key().to_string(), category);
        for alias in category.aliases() {
            table.entry(alias.to_string()).or_insert(category);
        }
    }
    table
});

/// Maps public category keys to categories, element types and labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryResolver;

impl CategoryResolver {
    /// Create a resolver.
    pub fn new() -> Self {
        Self
    }

    /// Resolve a request key (case-insensitive, aliases accepted).
    pub fn resolve(&self, key: &str) -> Option<Category> {
        let normalized = key.trim().to_lowercase().replace(['-', ' '], "_");
        KEY_TABLE.get(&normalized).copied()
    }

    /// Element type for a request key.
    pub fn element_type(&self, key: &str) -> Option<&'static str> {
        self.resolve(key).map(|c| c.element_type())
    }

    /// Display label for a request key.
    pub fn display_label(&self, key: &str) -> Option<&'static str> {
        self.resolve(key).map(|c| c.display_label())
    }

    /// Reorder selection entries to the fixed display priority.
    ///
    /// Keys outside [`DISPLAY_PRIORITY`] (unknown keys included) are appended
    /// afterwards in their original relative order.
    pub fn prioritize<T: Clone>(&self, entries: &[(String, T)]) -> Vec<(String, T)> {
        let mut ordered = Vec::with_capacity(entries.len());
        let mut taken = vec![false; entries.len()];

        for wanted in DISPLAY_PRIORITY {
            for (idx, (key, value)) in entries.iter().enumerate() {
                if !taken[idx] && self.resolve(key) == Some(wanted) {
                    ordered.push((key.clone(), value.clone()));
                    taken[idx] = true;
                }
            }
        }

        for (idx, entry) in entries.iter().enumerate() {
            if !taken[idx] {
                ordered.push(entry.clone());
            }
        }

        ordered
    }
}

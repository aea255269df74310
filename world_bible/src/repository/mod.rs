//! Name-indexed, read-only access to a [`Snapshot`].

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::category::Category;
use crate::entities::{entity_name, normalize_name, Entity};
use crate::snapshot::Snapshot;

/// Indexes a snapshot by category and normalized entity name.
///
/// Cheap to clone; the snapshot is shared.
#[derive(Debug, Clone)]
pub struct Repository {
    snapshot: Arc<Snapshot>,
    /// (category, normalized name) -> position in the category list.
    name_index: HashMap<(Category, String), usize>,
}

impl Repository {
    /// Index a snapshot.
    ///
    /// When two entities share a normalized name the first one wins.
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        let mut name_index = HashMap::new();

        for category in Category::LISTS {
            for (idx, entity) in snapshot.entities(category).iter().enumerate() {
                if let Some(name) = entity_name(entity, category.name_keys()) {
                    name_index
                        .entry((category, normalize_name(name)))
                        .or_insert(idx);
                }
            }
        }

        Self {
            snapshot,
            name_index,
        }
    }

    /// The underlying snapshot.
    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    /// Find an entity by name.
    ///
    /// Both sides are normalized (typographic quotes, non-breaking spaces)
    /// before comparing. Logs a warning and returns `None` on no match.
    pub fn get_by_name(&self, category: Category, name: &str) -> Option<&Entity> {
        let found = self.find(category, name);
        if found.is_none() {
            warn!(category = %category, name = %name, "Entity not found");
        }
        found
    }

    /// Like [`get_by_name`](Self::get_by_name) without the warning.
    pub fn find(&self, category: Category, name: &str) -> Option<&Entity> {
        let idx = self.name_index.get(&(category, normalize_name(name)))?;
        self.snapshot.entities(category).get(*idx)
    }

    /// Whether an entity with this name exists.
    pub fn contains(&self, category: Category, name: &str) -> bool {
        self.name_index
            .contains_key(&(category, normalize_name(name)))
    }

    /// All entities of a category.
    pub fn entities(&self, category: Category) -> &[Entity] {
        self.snapshot.entities(category)
    }

    /// Names of all entities of a category, in file order.
    pub fn names(&self, category: Category) -> Vec<&str> {
        self.snapshot
            .entities(category)
            .iter()
            .filter_map(|e| entity_name(e, category.name_keys()))
            .collect()
    }

    /// Name of an entity within a category.
    pub fn entity_name<'a>(&self, category: Category, entity: &'a Entity) -> Option<&'a str> {
        entity_name(entity, category.name_keys())
    }

    /// Entities whose element type matches, used for field detection.
    pub fn entities_of_type(&self, element_type: &str) -> &[Entity] {
        Category::LISTS
            .iter()
            .find(|c| c.element_type() == element_type)
            .map(|c| self.snapshot.entities(*c))
            .unwrap_or(&[])
    }

    /// One of the structure objects.
    pub fn structure(&self, category: Category) -> Option<&Value> {
        self.snapshot.structure(category)
    }

    /// The vision document.
    pub fn vision(&self) -> &Value {
        self.snapshot.vision()
    }
}

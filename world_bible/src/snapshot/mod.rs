//! Immutable in-memory snapshot of the knowledge base.
//!
//! A [`Snapshot`] is produced once by the [`Loader`] and then shared
//! read-only (typically behind an `Arc`) by every build.

mod cache;
mod loader;

pub use cache::*;
pub use loader::*;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::category::Category;
use crate::entities::Entity;

/// Knowledge-base contents, one typed list per category plus the two
/// structure objects and the vision document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    lists: HashMap<Category, Vec<Entity>>,
    macro_structure: Value,
    micro_structure: Value,
    vision: Value,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a snapshot.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Entities of a list category (empty for structure categories).
    pub fn entities(&self, category: Category) -> &[Entity] {
        self.lists.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One of the two single-object structure categories.
    ///
    /// Returns `None` for list categories.
    pub fn structure(&self, category: Category) -> Option<&Value> {
        match category {
            Category::MacroStructure => Some(&self.macro_structure),
            Category::MicroStructure => Some(&self.micro_structure),
            _ => None,
        }
    }

    /// The vision document (empty object when absent).
    pub fn vision(&self) -> &Value {
        &self.vision
    }

    /// Total number of list entities.
    pub fn entity_count(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }

    /// Whether no category holds any data.
    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0
            && is_blank(&self.macro_structure)
            && is_blank(&self.micro_structure)
            && is_blank(&self.vision)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Builder for [`Snapshot`].
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    /// Set the entity list of a category.
    ///
    /// Structure categories accept the first object of `entities`.
    pub fn with_entities(mut self, category: Category, entities: Vec<Entity>) -> Self {
        if category.is_structure() {
            let object = entities
                .into_iter()
                .find(Value::is_object)
                .unwrap_or_else(|| Value::Object(Map::new()));
            return self.with_structure(category, object);
        }
        self.snapshot.lists.insert(category, entities);
        self
    }

    /// Append a single entity to a list category.
    pub fn with_entity(mut self, category: Category, entity: Entity) -> Self {
        if !category.is_structure() {
            self.snapshot.lists.entry(category).or_default().push(entity);
        }
        self
    }

    /// Set one of the structure objects. Ignored for list categories.
    pub fn with_structure(mut self, category: Category, structure: Value) -> Self {
        match category {
            Category::MacroStructure => self.snapshot.macro_structure = structure,
            Category::MicroStructure => self.snapshot.micro_structure = structure,
            _ => {}
        }
        self
    }

    /// Set the vision document.
    pub fn with_vision(mut self, vision: Value) -> Self {
        self.snapshot.vision = vision;
        self
    }

    /// Finish building.
    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::new();
        assert!(snapshot.is_empty());
        assert!(snapshot.entities(Category::Characters).is_empty());
        assert_eq!(snapshot.structure(Category::Characters), None);
    }

    #[test]
    fn test_builder() {
        let snapshot = Snapshot::builder()
            .with_entity(Category::Characters, json!({"Nom": "Aria"}))
            .with_entity(Category::Characters, json!({"Nom": "Bob"}))
            .with_entities(Category::Locations, vec![json!({"Nom": "Port"})])
            .with_structure(Category::MacroStructure, json!({"Actes": 3}))
            .with_vision(json!({"Ton": "sombre"}))
            .build();

        assert_eq!(snapshot.entities(Category::Characters).len(), 2);
        assert_eq!(snapshot.entity_count(), 3);
        assert_eq!(
            snapshot.structure(Category::MacroStructure),
            Some(&json!({"Actes": 3}))
        );
        assert_eq!(snapshot.vision()["Ton"], json!("sombre"));
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_structure_via_entities() {
        let snapshot = Snapshot::builder()
            .with_entities(Category::MicroStructure, vec![json!("x"), json!({"Scène": 1})])
            .with_entity(Category::MacroStructure, json!({"ignored": true}))
            .build();

        assert_eq!(
            snapshot.structure(Category::MicroStructure),
            Some(&json!({"Scène": 1}))
        );
        assert_eq!(snapshot.structure(Category::MacroStructure), Some(&Value::Null));
    }
}

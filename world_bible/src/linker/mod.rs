//! Relationship closures between knowledge-base entities.
//!
//! Relations are free text in the source documents, so links are found by
//! scanning relation-like fields for whole-word occurrences of known names.

mod matcher;

pub use matcher::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::category::Category;
use crate::entities::{names_match, Entity};
use crate::repository::Repository;
use crate::value::FieldPath;

/// Relation-like fields of an entity and the categories they point into.
struct RelationField {
    keys: &'static [&'static str],
    targets: &'static [Category],
}

const CHARACTER_RELATIONS: &[RelationField] = &[
    RelationField {
        keys: &["Objets", "Possessions", "Inventaire", "Items", "Équipement", "Equipement"],
        targets: &[Category::Items],
    },
    RelationField {
        keys: &["Espèce", "Espece", "Species", "Race"],
        targets: &[Category::Species],
    },
    RelationField {
        keys: &["Communautés", "Communautes", "Communauté", "Communities", "Affiliation", "Faction"],
        targets: &[Category::Communities],
    },
    RelationField {
        keys: &["Résidence", "Residence", "Lieux de vie", "Lieu de vie", "Lieu", "Location"],
        targets: &[Category::Locations],
    },
    RelationField {
        keys: &[
            "Relations",
            "Relationships",
            "Liens",
            "Background.Relations",
            "Background.Relationships",
        ],
        targets: &[Category::Characters, Category::Communities],
    },
];

const LOCATION_RELATIONS: &[RelationField] = &[
    RelationField {
        keys: &["Contient", "Sous-lieux", "Sous-lieu", "Contains", "Sub-locations"],
        targets: &[Category::Locations],
    },
    RelationField {
        keys: &["Région", "Region", "Parent", "Situé dans", "Localisation"],
        targets: &[Category::Locations],
    },
    RelationField {
        keys: &["Personnages présents", "Personnages", "Habitants", "Characters", "Present"],
        targets: &[Category::Characters],
    },
    RelationField {
        keys: &["Objets", "Items"],
        targets: &[Category::Items],
    },
    RelationField {
        keys: &["Communautés", "Communautes", "Communities"],
        targets: &[Category::Communities],
    },
    RelationField {
        keys: &["Espèces", "Especes", "Species", "Faune"],
        targets: &[Category::Species],
    },
];

/// Fields of other entities that state where they are.
const PRESENCE_FIELDS: &[(Category, &[&str])] = &[
    (Category::Locations, &["Région", "Region", "Parent", "Situé dans", "Localisation"]),
    (
        Category::Characters,
        &["Résidence", "Residence", "Lieux de vie", "Lieu de vie", "Lieu", "Location"],
    ),
    (Category::Items, &["Lieu", "Location", "Emplacement"]),
];

/// Names linked to a source entity, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedElements {
    by_category: BTreeMap<Category, BTreeSet<String>>,
}

impl LinkedElements {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a link.
    pub fn insert(&mut self, category: Category, name: impl Into<String>) {
        self.by_category.entry(category).or_default().insert(name.into());
    }

    /// Linked names of a category, sorted.
    pub fn names(&self, category: Category) -> Vec<&str> {
        self.by_category
            .get(&category)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether a name is linked in a category.
    pub fn contains(&self, category: Category, name: &str) -> bool {
        self.by_category
            .get(&category)
            .is_some_and(|set| set.contains(name))
    }

    /// Iterate over non-empty categories.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &BTreeSet<String>)> {
        self.by_category
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(c, set)| (*c, set))
    }

    /// Total number of links.
    pub fn len(&self) -> usize {
        self.by_category.values().map(BTreeSet::len).sum()
    }

    /// Whether there are no links.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: LinkedElements) {
        for (category, names) in other.by_category {
            self.by_category.entry(category).or_default().extend(names);
        }
    }

    /// Remove a name from a category.
    pub fn remove(&mut self, category: Category, name: &str) {
        if let Some(set) = self.by_category.get_mut(&category) {
            set.retain(|n| !names_match(n, name));
        }
    }
}

/// Computes relationship closures over a [`Repository`].
pub struct Linker<'a> {
    repository: &'a Repository,
}

impl<'a> Linker<'a> {
    /// Create a linker over a repository.
    pub fn new(repository: &'a Repository) -> Self {
        Self { repository }
    }

    /// Links for an optional character and a set of locations.
    pub fn linked(&self, character: Option<&str>, locations: &[String]) -> LinkedElements {
        let mut result = LinkedElements::new();
        if let Some(name) = character {
            result.merge(self.linked_for_character(name));
        }
        if !locations.is_empty() {
            result.merge(self.linked_for_locations(locations));
        }
        if let Some(name) = character {
            result.remove(Category::Characters, name);
        }
        for location in locations {
            result.remove(Category::Locations, location);
        }
        result
    }

    /// Items, species, communities, locations and characters a character
    /// refers to.
    pub fn linked_for_character(&self, name: &str) -> LinkedElements {
        let mut result = LinkedElements::new();
        let Some(entity) = self.repository.get_by_name(Category::Characters, name) else {
            return result;
        };

        self.scan_relations(entity, CHARACTER_RELATIONS, &mut result);
        result.remove(Category::Characters, name);
        debug!(character = %name, links = result.len(), "Character links resolved");
        result
    }

    /// Entities contained in, present at, or containing the given locations.
    ///
    /// Scans the locations' own containment/presence fields, then the
    /// presence fields of every other entity that mention them.
    pub fn linked_for_locations(&self, names: &[String]) -> LinkedElements {
        let mut result = LinkedElements::new();
        let mut sources = Vec::new();

        for name in names {
            if let Some(entity) = self.repository.get_by_name(Category::Locations, name) {
                self.scan_relations(entity, LOCATION_RELATIONS, &mut result);
                sources.push(name.as_str());
            }
        }

        if !sources.is_empty() {
            let matcher = NameMatcher::new(sources.iter().copied());
            for (category, keys) in PRESENCE_FIELDS {
                for entity in self.repository.entities(*category) {
                    let Some(entity_name) = self.repository.entity_name(*category, entity) else {
                        continue;
                    };
                    let text = relation_text(entity, keys);
                    if !text.is_empty() && !matcher.find_all(&text).is_empty() {
                        result.insert(*category, entity_name);
                    }
                }
            }
        }

        for name in names {
            result.remove(Category::Locations, name);
        }
        debug!(locations = names.len(), links = result.len(), "Location links resolved");
        result
    }

    fn scan_relations(&self, entity: &Entity, fields: &[RelationField], result: &mut LinkedElements) {
        for field in fields {
            let text = relation_text(entity, field.keys);
            if text.is_empty() {
                continue;
            }
            for target in field.targets {
                let matcher = NameMatcher::new(self.repository.names(*target));
                for found in matcher.find_all(&text) {
                    result.insert(*target, found);
                }
            }
        }
    }
}

/// Concatenate every string found under the given keys of an entity.
fn relation_text(entity: &Entity, keys: &[&str]) -> String {
    let mut parts = Vec::new();
    for key in keys {
        if let Some(value) = lookup_field(entity, key) {
            collect_strings(value, &mut parts);
        }
    }
    parts.join("\n")
}

/// Resolve a dotted path, falling back to a case-insensitive top-level key.
fn lookup_field<'e>(entity: &'e Entity, key: &str) -> Option<&'e Value> {
    let path = FieldPath::new(key);
    if let Some(found) = path.resolve(entity) {
        return Some(found);
    }
    if !path.is_direct() {
        return None;
    }
    let wanted = key.to_lowercase();
    entity
        .as_object()?
        .iter()
        .find(|(k, _)| k.to_lowercase() == wanted)
        .map(|(_, v)| v)
}

fn collect_strings<'v>(value: &'v Value, out: &mut Vec<&'v str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use serde_json::json;
    use std::sync::Arc;

    fn repository() -> Repository {
        let snapshot = Snapshot::builder()
            .with_entity(
                Category::Characters,
                json!({
                    "Nom": "Aria",
                    "Espèce": "Humaine",
                    "Objets": ["Dague d'argent"],
                    "Communautés": "La Guilde",
                    "Résidence": "Port Aveugle",
                    "Background": { "Relations": "Sœur de Bob, rivale d'Aria la Vieille. Aria se méfie." }
                }),
            )
            .with_entity(Category::Characters, json!({"Nom": "Bob", "Lieu": "Port Aveugle"}))
            .with_entity(Category::Characters, json!({"Nom": "Bobby"}))
            .with_entity(Category::Characters, json!({"Nom": "Aria la Vieille"}))
            .with_entity(Category::Species, json!({"Nom": "Humaine"}))
            .with_entity(Category::Items, json!({"Nom": "Dague d'argent"}))
            .with_entity(Category::Items, json!({"Nom": "Lanterne", "Emplacement": "Phare de Port Aveugle"}))
            .with_entity(Category::Communities, json!({"Nom": "La Guilde"}))
            .with_entity(
                Category::Locations,
                json!({"Nom": "Port Aveugle", "Région": "Côte Grise", "Contient": ["Phare"]}),
            )
            .with_entity(Category::Locations, json!({"Nom": "Côte Grise"}))
            .with_entity(Category::Locations, json!({"Nom": "Phare", "Région": "Port Aveugle"}))
            .build();
        Repository::new(Arc::new(snapshot))
    }

    #[test]
    fn test_character_links() {
        let repo = repository();
        let links = Linker::new(&repo).linked_for_character("Aria");

        assert_eq!(links.names(Category::Species), vec!["Humaine"]);
        assert_eq!(links.names(Category::Items), vec!["Dague d'argent"]);
        assert_eq!(links.names(Category::Communities), vec!["La Guilde"]);
        assert_eq!(links.names(Category::Locations), vec!["Port Aveugle"]);
        assert!(links.contains(Category::Characters, "Bob"));
        assert!(links.contains(Category::Characters, "Aria la Vieille"));
        assert!(!links.contains(Category::Characters, "Bobby"));
    }

    #[test]
    fn test_no_self_link() {
        let repo = repository();
        let links = Linker::new(&repo).linked_for_character("Aria");
        assert!(!links.contains(Category::Characters, "Aria"));
    }

    #[test]
    fn test_location_links_both_directions() {
        let repo = repository();
        let links = Linker::new(&repo).linked_for_locations(&["Port Aveugle".to_string()]);

        assert!(links.contains(Category::Locations, "Côte Grise"));
        assert!(links.contains(Category::Locations, "Phare"));
        assert!(links.contains(Category::Characters, "Bob"));
        assert!(links.contains(Category::Characters, "Aria"));
        assert!(links.contains(Category::Items, "Lanterne"));
        assert!(!links.contains(Category::Locations, "Port Aveugle"));
    }

    #[test]
    fn test_linked_union_and_unknown_sources() {
        let repo = repository();
        let linker = Linker::new(&repo);

        let links = linker.linked(Some("Aria"), &["Phare".to_string()]);
        assert!(links.contains(Category::Locations, "Port Aveugle"));
        assert!(!links.contains(Category::Locations, "Phare"));
        assert!(!links.contains(Category::Characters, "Aria"));

        assert!(linker.linked(Some("Nobody"), &[]).is_empty());
    }
}

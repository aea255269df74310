//! Knowledge-base categories.
//!
//! Each category has a fixed on-disk file stem, a public request key, an
//! element type used by the field configuration, and a display label used
//! in rendered output.

mod resolver;

pub use resolver::*;

use serde::{Deserialize, Serialize};

/// Top-level groupings of knowledge-base entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Characters,
    Locations,
    Items,
    Species,
    Communities,
    Quests,
    /// Example dialogues used as style references.
    Dialogues,
    /// List of narrative structures (arcs, acts).
    NarrativeStructures,
    /// Single-object macro structure of the story.
    MacroStructure,
    /// Single-object micro structure (scene-level conventions).
    MicroStructure,
}

impl Category {
    /// Every category, in file-loading order.
    pub const ALL: [Category; 10] = [
        Category::Characters,
        Category::Locations,
        Category::Items,
        Category::Species,
        Category::Communities,
        Category::Dialogues,
        Category::NarrativeStructures,
        Category::MacroStructure,
        Category::MicroStructure,
        Category::Quests,
    ];

    /// Categories holding a list of named entities.
    pub const LISTS: [Category; 8] = [
        Category::Characters,
        Category::Locations,
        Category::Items,
        Category::Species,
        Category::Communities,
        Category::Quests,
        Category::Dialogues,
        Category::NarrativeStructures,
    ];

    /// Stem of the category file (`<stem>.json`, or `<stem>_full.json`).
    pub fn file_stem(&self) -> &'static str {
        match self {
            Category::Characters => "personnages",
            Category::Locations => "lieux",
            Category::Items => "objets",
            Category::Species => "especes",
            Category::Communities => "communautes",
            Category::Quests => "quetes",
            Category::Dialogues => "dialogues",
            Category::NarrativeStructures => "structure_narrative",
            Category::MacroStructure => "structure_macro",
            Category::MicroStructure => "structure_micro",
        }
    }

    /// Key under which a wrapping object stores the entity list.
    pub fn wrapper_key(&self) -> &'static str {
        self.file_stem()
    }

    /// Public key used in selection requests.
    pub fn key(&self) -> &'static str {
        match self {
            Category::Characters => "characters",
            Category::Locations => "locations",
            Category::Items => "items",
            Category::Species => "species",
            Category::Communities => "communities",
            Category::Quests => "quests",
            Category::Dialogues => "dialogues",
            Category::NarrativeStructures => "narrative_structures",
            Category::MacroStructure => "macro_structure",
            Category::MicroStructure => "micro_structure",
        }
    }

    /// Element type used to look up field configuration.
    pub fn element_type(&self) -> &'static str {
        match self {
            Category::Characters => "character",
            Category::Locations => "location",
            Category::Items => "item",
            Category::Species => "species",
            Category::Communities => "community",
            Category::Quests => "quest",
            Category::Dialogues => "dialogue_example",
            Category::NarrativeStructures => "narrative_structure",
            Category::MacroStructure => "macro_structure",
            Category::MicroStructure => "micro_structure",
        }
    }

    /// Label shown in rendered output.
    pub fn display_label(&self) -> &'static str {
        match self {
            Category::Characters => "CHARACTERS",
            Category::Locations => "LOCATIONS",
            Category::Items => "ITEMS",
            Category::Species => "SPECIES",
            Category::Communities => "COMMUNITIES",
            Category::Quests => "QUESTS",
            Category::Dialogues => "DIALOGUE EXAMPLES",
            Category::NarrativeStructures => "NARRATIVE STRUCTURES",
            Category::MacroStructure => "MACRO STRUCTURE",
            Category::MicroStructure => "MICRO STRUCTURE",
        }
    }

    /// Singular label for numbered entity banners.
    pub fn item_label(&self) -> &'static str {
        match self {
            Category::Characters => "CHARACTER",
            Category::Locations => "LOCATION",
            Category::Items => "ITEM",
            Category::Species => "SPECIES",
            Category::Communities => "COMMUNITY",
            Category::Quests => "QUEST",
            Category::Dialogues => "DIALOGUE EXAMPLE",
            Category::NarrativeStructures => "NARRATIVE STRUCTURE",
            Category::MacroStructure => "MACRO STRUCTURE",
            Category::MicroStructure => "MICRO STRUCTURE",
        }
    }

    /// Whether the category file holds a single object rather than a list.
    pub fn is_structure(&self) -> bool {
        matches!(self, Category::MacroStructure | Category::MicroStructure)
    }

    /// Keys tried, in order, when reading an entity's name.
    pub fn name_keys(&self) -> &'static [&'static str] {
        match self {
            Category::Dialogues => &["Name", "Nom", "Title", "Titre", "ID"],
            _ => &["Name", "Nom"],
        }
    }

    /// Additional accepted request keys (French file-stem aliases).
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Category::Characters => &["personnages", "character"],
            Category::Locations => &["lieux", "location"],
            Category::Items => &["objets", "item"],
            Category::Species => &["especes", "espèces"],
            Category::Communities => &["communautes", "communautés", "community"],
            Category::Quests => &["quetes", "quêtes", "quest"],
            Category::Dialogues => &["dialogue_examples", "exemples_dialogues"],
            Category::NarrativeStructures => &["structure_narrative", "narrative_structure"],
            Category::MacroStructure => &["structure_macro"],
            Category::MicroStructure => &["structure_micro"],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

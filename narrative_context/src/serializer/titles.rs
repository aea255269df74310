//! Section-title and field-name lookup tables for the tag tree.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::text::{fold, keywords};

/// Semantic element names for known subsection titles.
const TITLE_TAGS: &[(&str, &str)] = &[
    ("identité", "identity"),
    ("identity", "identity"),
    ("caractérisation", "characterization"),
    ("characterization", "characterization"),
    ("personnalité", "characterization"),
    ("voix", "voice"),
    ("voice", "voice"),
    ("background", "background"),
    ("histoire", "background"),
    ("history", "background"),
    ("mécaniques", "mechanics"),
    ("mechanics", "mechanics"),
    ("résumé", "summary"),
    ("summary", "summary"),
    ("arcs narratifs", "narrative_arcs"),
    ("narrative arcs", "narrative_arcs"),
];

/// Titles of generic catch-all subsections.
const CATCH_ALL_TITLES: &[&str] = &[
    "informations",
    "autres informations",
    "other information",
    "other informations",
];

static TITLE_TABLE: Lazy<HashMap<String, &'static str>> =
    Lazy::new(|| TITLE_TAGS.iter().map(|(title, tag)| (fold(title), *tag)).collect());

/// Element name for a known subsection title.
pub fn title_tag(title: &str) -> Option<&'static str> {
    TITLE_TABLE.get(&fold(title.trim())).copied()
}

/// Whether a subsection title names the generic catch-all.
pub fn is_catch_all_title(title: &str) -> bool {
    let folded = fold(title.trim());
    CATCH_ALL_TITLES.iter().any(|t| fold(t) == folded)
}

/// Where a catch-all field is moved in the tag tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatchAllGroup {
    Identity,
    Metadata,
    Relationships,
}

impl CatchAllGroup {
    /// Groups in output order.
    pub const ORDER: [CatchAllGroup; 3] = [
        CatchAllGroup::Identity,
        CatchAllGroup::Metadata,
        CatchAllGroup::Relationships,
    ];

    /// Element name of the group.
    pub fn tag(&self) -> &'static str {
        match self {
            CatchAllGroup::Identity => "identity",
            CatchAllGroup::Metadata => "metadata",
            CatchAllGroup::Relationships => "relationships",
        }
    }

    /// Group of a field, from its label.
    pub fn for_label(label: &str) -> CatchAllGroup {
        for word in keywords(label, 1) {
            if RELATIONSHIP_WORDS.iter().any(|kw| word_matches(&word, kw)) {
                return CatchAllGroup::Relationships;
            }
            if IDENTITY_WORDS.iter().any(|kw| word_matches(&word, kw)) {
                return CatchAllGroup::Identity;
            }
        }
        CatchAllGroup::Metadata
    }
}

const IDENTITY_WORDS: &[&str] = &[
    "nom", "name", "alias", "titre", "title", "age", "sexe", "genre", "gender", "espece",
    "species", "race", "occupation", "role", "type",
];

const RELATIONSHIP_WORDS: &[&str] = &[
    "relation", "allie", "allies", "ally", "ennemi", "enemy", "enemies", "famille", "family", "ami",
    "amis", "friend", "rival", "membre", "member", "faction", "communaute", "community",
    "affiliation", "lien", "liens",
];

fn word_matches(word: &str, keyword: &str) -> bool {
    word == keyword || (keyword.chars().count() >= 5 && word.starts_with(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_tag() {
        assert_eq!(title_tag("Identité"), Some("identity"));
        assert_eq!(title_tag(" CARACTÉRISATION "), Some("characterization"));
        assert_eq!(title_tag("Arcs narratifs"), Some("narrative_arcs"));
        assert_eq!(title_tag("Résumé"), Some("summary"));
        assert_eq!(title_tag("Divers"), None);
    }

    #[test]
    fn test_catch_all_titles() {
        assert!(is_catch_all_title("Informations"));
        assert!(is_catch_all_title("Autres informations"));
        assert!(!is_catch_all_title("Identité"));
    }

    #[test]
    fn test_catch_all_groups() {
        assert_eq!(CatchAllGroup::for_label("Espèce"), CatchAllGroup::Identity);
        assert_eq!(CatchAllGroup::for_label("Relations"), CatchAllGroup::Relationships);
        assert_eq!(CatchAllGroup::for_label("Alliés"), CatchAllGroup::Relationships);
        assert_eq!(CatchAllGroup::for_label("Humeur"), CatchAllGroup::Metadata);
    }
}

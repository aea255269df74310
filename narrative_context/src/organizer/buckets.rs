//! Keyword tables behind the narrative and minimal strategies.

use crate::text::{keywords, normalize_field_name};
use world_bible::FieldPath;

/// Thematic bucket of the narrative strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Identity,
    Characterization,
    Voice,
    Background,
    Mechanics,
    Other,
}

const IDENTITY_KEYWORDS: &[&str] = &[
    "nom", "name", "alias", "titre", "title", "age", "sexe", "genre", "gender", "espece", "species",
    "occupation", "role", "type", "apparence", "appearance",
];

const CHARACTERIZATION_KEYWORDS: &[&str] = &[
    "personnalite", "personality", "caractere", "trait", "motivation", "desir", "desire", "peur",
    "fear", "qualite", "defaut", "flaw", "valeur", "psychologie", "caracterisation",
    "characterization", "objectif", "goal",
];

const VOICE_KEYWORDS: &[&str] = &[
    "dialogue", "voix", "voice", "langage", "parler", "expression", "ton", "tic", "tics", "registre",
    "speech", "vocabulaire",
];

const BACKGROUND_KEYWORDS: &[&str] = &[
    "background", "histoire", "history", "passe", "relation", "origine", "origin", "famille",
    "family", "contexte", "biographie", "biography",
];

const MECHANICS_KEYWORDS: &[&str] = &[
    "mecanique", "mechanic", "stat", "stats", "competence", "skill", "capacite", "ability",
    "abilities", "combat", "inventaire", "inventory", "niveau", "level", "gameplay", "pouvoir",
    "power",
];

impl Bucket {
    /// Buckets in output order.
    pub const ORDER: [Bucket; 6] = [
        Bucket::Identity,
        Bucket::Characterization,
        Bucket::Voice,
        Bucket::Background,
        Bucket::Mechanics,
        Bucket::Other,
    ];

    /// Section title of the bucket.
    pub fn title(&self) -> &'static str {
        match self {
            Bucket::Identity => "Identité",
            Bucket::Characterization => "Caractérisation",
            Bucket::Voice => "Voix",
            Bucket::Background => "Background",
            Bucket::Mechanics => "Mécaniques",
            Bucket::Other => "Autres informations",
        }
    }

    /// Whether this is the generic catch-all bucket.
    pub fn is_catch_all(&self) -> bool {
        matches!(self, Bucket::Other)
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Bucket::Identity => IDENTITY_KEYWORDS,
            Bucket::Characterization => CHARACTERIZATION_KEYWORDS,
            Bucket::Voice => VOICE_KEYWORDS,
            Bucket::Background => BACKGROUND_KEYWORDS,
            Bucket::Mechanics => MECHANICS_KEYWORDS,
            Bucket::Other => &[],
        }
    }

    /// Categorize a path by its words, outermost segment first.
    ///
    /// The first word matching any bucket decides; unmatched paths go to
    /// [`Bucket::Other`].
    pub fn for_path(path: &FieldPath) -> Bucket {
        for word in keywords(path.as_str(), 1) {
            if let Some(bucket) = Bucket::ORDER
                .iter()
                .find(|b| b.keywords().iter().any(|kw| word_matches(&word, kw)))
            {
                return *bucket;
            }
        }
        Bucket::Other
    }
}

/// Exact match, or prefix match for keywords long enough to be unambiguous
/// (`relation` matches `relations`, `age` does not match `agence`).
fn word_matches(word: &str, keyword: &str) -> bool {
    word == keyword || (keyword.chars().count() >= 5 && word.starts_with(keyword))
}

const CHARACTER_ESSENTIALS: &[&str] = &[
    "nom", "name", "alias", "espece", "species", "occupation", "role", "resume", "summary",
];
const LOCATION_ESSENTIALS: &[&str] = &["nom", "name", "type", "region", "resume", "summary", "description"];
const GENERIC_ESSENTIALS: &[&str] = &["nom", "name", "titre", "title", "type", "resume", "summary", "description"];

/// Built-in essential fields per element type, matched on the normalized
/// top-level segment.
pub fn builtin_essentials(element_type: &str) -> &'static [&'static str] {
    match element_type {
        "character" => CHARACTER_ESSENTIALS,
        "location" => LOCATION_ESSENTIALS,
        _ => GENERIC_ESSENTIALS,
    }
}

/// Whether a path is essential for an element type without configuration.
pub fn is_builtin_essential(element_type: &str, path: &FieldPath) -> bool {
    let Some(first) = path.segments().next() else {
        return false;
    };
    let first = normalize_field_name(first);
    builtin_essentials(element_type).contains(&first.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_for_path() {
        assert_eq!(Bucket::for_path(&FieldPath::new("Nom")), Bucket::Identity);
        assert_eq!(Bucket::for_path(&FieldPath::new("Âge")), Bucket::Identity);
        assert_eq!(Bucket::for_path(&FieldPath::new("Background.Relations")), Bucket::Background);
        assert_eq!(Bucket::for_path(&FieldPath::new("Background.Nom")), Bucket::Background);
        assert_eq!(Bucket::for_path(&FieldPath::new("Caractérisation.Désir")), Bucket::Characterization);
        assert_eq!(Bucket::for_path(&FieldPath::new("Dialogue.Exemples")), Bucket::Voice);
        assert_eq!(Bucket::for_path(&FieldPath::new("Compétences")), Bucket::Mechanics);
        assert_eq!(Bucket::for_path(&FieldPath::new("Agence")), Bucket::Other);
    }

    #[test]
    fn test_builtin_essentials() {
        assert!(is_builtin_essential("character", &FieldPath::new("Espèce")));
        assert!(!is_builtin_essential("character", &FieldPath::new("Notes")));
        assert!(is_builtin_essential("item", &FieldPath::new("Description.Courte")));
    }
}

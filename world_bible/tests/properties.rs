use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

use world_bible::{names_match, normalize_name, Category, FieldPath, Repository, Snapshot};

/// Replace plain apostrophes/quotes/spaces with typographic variants.
fn typographic(name: &str, variant: usize) -> String {
    const APOSTROPHES: [char; 3] = ['\u{2019}', '\u{2018}', '\u{02BC}'];
    const QUOTES: [char; 3] = ['\u{201C}', '\u{201D}', '\u{00AB}'];
    const SPACES: [char; 3] = ['\u{00A0}', '\u{202F}', '\u{2007}'];

    name.chars()
        .map(|c| match c {
            '\'' => APOSTROPHES[variant % 3],
            '"' => QUOTES[variant % 3],
            ' ' => SPACES[variant % 3],
            other => other,
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_typographic_variants_match(
        name in "[A-Za-z][A-Za-z' \"]{0,20}[A-Za-z]",
        variant in 0usize..3,
    ) {
        let fancy = typographic(&name, variant);
        prop_assert!(names_match(&name, &fancy));
        prop_assert_eq!(normalize_name(&name), normalize_name(&fancy));
    }

    #[test]
    fn prop_lookup_is_variant_insensitive(
        name in "[A-Z][a-z]{1,8}( [A-Z]'[a-z]{1,8})?",
        variant in 0usize..3,
    ) {
        let snapshot = Snapshot::builder()
            .with_entity(Category::Characters, json!({ "Nom": typographic(&name, variant) }))
            .build();
        let repo = Repository::new(Arc::new(snapshot));

        prop_assert!(repo.get_by_name(Category::Characters, &name).is_some());
    }

    #[test]
    fn prop_ancestor_relation(
        segments in prop::collection::vec("[A-Za-z]{1,6}", 1..5),
        extra in prop::collection::vec("[A-Za-z]{1,6}", 1..3),
    ) {
        let ancestor = FieldPath::from_segments(&segments);
        let descendant = FieldPath::from_segments(segments.iter().chain(extra.iter()));

        prop_assert!(ancestor.is_ancestor_of(&descendant));
        prop_assert!(!descendant.is_ancestor_of(&ancestor));
        prop_assert!(!ancestor.is_ancestor_of(&ancestor));
    }
}

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use narrative_context::{
    dedupe_by_value, drop_ancestor_paths, AssemblerConfig, ContextSerializer, ContextTree,
    ExtractedField, FlatTextSerializer, OutputFormat, PromptAssembler, PromptSection, SectionKind,
    Subsection, TagTreeSerializer, TreeItem, TreeSection, Truncator, TRUNCATION_MARKER,
};
use world_bible::{Category, FieldPath};

fn character_tree(subsections: Vec<Subsection>) -> ContextTree {
    let mut main = TreeSection::main();
    main.category_mut(Category::Characters)
        .push(TreeItem::new("Aria", 0, subsections));
    let mut tree = ContextTree::new();
    tree.push_section(main);
    tree
}

fn fields(entries: &BTreeMap<String, String>) -> Vec<ExtractedField> {
    entries
        .iter()
        .map(|(label, value)| ExtractedField::new(label.as_str(), label.as_str(), json!(value)))
        .collect()
}

proptest! {
    #[test]
    fn prop_truncate_fits_and_is_idempotent(
        words in prop::collection::vec("[a-z]{1,8}", 0..60),
        budget in 1usize..30,
    ) {
        let truncator = Truncator::default();
        let text = words.join(" ");

        let once = truncator.truncate(&text, budget);
        prop_assert!(truncator.cost(&once) <= budget);
        prop_assert_eq!(truncator.truncate(&once, budget), once.clone());
        prop_assert!(once.matches(TRUNCATION_MARKER).count() <= 1);
        if words.len() > budget {
            prop_assert!(once.ends_with(TRUNCATION_MARKER));
        } else {
            prop_assert_eq!(once, text);
        }
    }

    #[test]
    fn prop_dialogue_keeps_recent_lines(
        lines in prop::collection::vec("[A-Z]{3}: [a-z]{1,6}( [a-z]{1,6}){0,4}", 1..12),
        budget in 1usize..30,
    ) {
        let truncator = Truncator::default();
        let text = lines.join("\n");

        let once = truncator.truncate_dialogue(&text, budget);
        prop_assert!(truncator.cost(&once) <= budget);
        prop_assert_eq!(truncator.truncate_dialogue(&once, budget), once.clone());
        if once != text {
            prop_assert!(once.starts_with(TRUNCATION_MARKER));
            prop_assert_eq!(once.matches(TRUNCATION_MARKER).count(), 1);
        }
    }

    #[test]
    fn prop_no_ancestor_survives(
        segments in prop::collection::vec(prop::collection::vec("[A-C]", 1..4), 1..8),
    ) {
        let paths: Vec<FieldPath> = segments.iter().map(FieldPath::from_segments).collect();
        let kept = drop_ancestor_paths(&paths);

        for path in &kept {
            prop_assert!(!kept.iter().any(|other| path.is_ancestor_of(other)));
        }
        for path in &paths {
            let is_leaf = !paths.iter().any(|other| path.is_ancestor_of(other));
            prop_assert_eq!(kept.contains(path), is_leaf);
        }
    }

    #[test]
    fn prop_value_dedup_prefers_direct_path(
        value in "[A-Za-z]{1,12}",
        parent in "Z[a-z]{2,8}",
        rotate in 0usize..3,
    ) {
        let mut entity = json!({
            "Nom": value.clone(),
            "Autre": { "Nom": format!("  {value}  ") },
        });
        entity[parent.as_str()] = json!({ "Alias": value.to_uppercase() });
        let mut paths = vec![
            FieldPath::from("Nom"),
            FieldPath::from_segments([parent.as_str(), "Alias"]),
            FieldPath::from("Autre.Nom"),
        ];
        paths.rotate_left(rotate);

        prop_assert_eq!(dedupe_by_value(&entity, &paths), vec![FieldPath::from("Nom")]);
    }

    #[test]
    fn prop_catch_all_does_not_repeat_structured_fields(
        label in "x[a-z]{3,8}",
        value in "v[0-9]{1,3}",
        extra in "y[a-z]{3,8}",
    ) {
        let tree = character_tree(vec![
            Subsection::fields(
                "Identité",
                vec![ExtractedField::new(label.as_str(), label.as_str(), json!(value))],
            ),
            Subsection::text(
                "Autres informations",
                format!("{label}: {value}\n{extra}: autre"),
            ),
        ]);
        let text = TagTreeSerializer::new().serialize(&tree);

        prop_assert_eq!(text.matches(&format!("<{label}>")).count(), 1);
        prop_assert_eq!(text.matches(&format!("<{extra}>")).count(), 1);
    }

    #[test]
    fn prop_flat_and_tags_carry_the_same_values(
        entries in prop::collection::btree_map("x[a-z]{3,8}", "v[0-9]{1,3}(\n\n?w[0-9]{1,3})?", 1..6),
    ) {
        let tree = character_tree(vec![Subsection::fields("Identité", fields(&entries))]);
        let flat = FlatTextSerializer::new().serialize(&tree);
        let tags = TagTreeSerializer::new().serialize(&tree);
        let document = PromptAssembler::new(
            AssemblerConfig { format: OutputFormat::TagTree, max_tokens: None },
            Truncator::default(),
        )
        .with_section(PromptSection::markup(SectionKind::Context, tags))
        .render()
        .validate()
        .unwrap();

        for (label, value) in &entries {
            let mut lines = value.lines();
            let mut flat_block = format!("{label}: {}", lines.next().unwrap_or_default());
            for line in lines {
                flat_block.push('\n');
                if !line.is_empty() {
                    flat_block.push_str("  ");
                    flat_block.push_str(line);
                }
            }
            prop_assert!(flat.contains(&flat_block));
            let tagged_block = format!("<{label}>{value}</{label}>");
            prop_assert!(document.text().contains(&tagged_block));
        }
        let flat_values = flat.lines().filter(|l| l.starts_with('x')).count();
        let tag_values = document.text().lines().filter(|l| l.trim().starts_with("<x")).count();
        prop_assert_eq!(flat_values, tag_values);
        prop_assert!(flat.lines().all(|l| l.trim_end() == l));
    }
}

#[test]
fn test_structured_value_keeps_shape() {
    let tree = character_tree(vec![Subsection::fields(
        "Identité",
        vec![ExtractedField::new(
            "Armes",
            "Armes",
            Value::Array(vec![json!("Épée"), json!("Arc")]),
        )],
    )]);

    let tags = TagTreeSerializer::new().serialize(&tree);
    assert!(tags.contains("<item>Épée</item>"));
    let flat = FlatTextSerializer::new().serialize(&tree);
    assert!(flat.contains("Armes: Épée, Arc"));
}

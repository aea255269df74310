use super::{push_labeled, ContextSerializer};
use crate::tree::{ContextTree, Subsection, SubsectionContent, TreeItem};
use world_bible::Category;

/// Banner line: `--- LABEL ---`.
pub fn banner(label: &str) -> String {
    format!("--- {label} ---")
}

/// Renders the tree as annotated plain text.
///
/// ```text
/// --- CHARACTERS ---
/// --- CHARACTER 1: Aria ---
/// [Identité]
/// Nom: Aria
/// ```
#[derive(Debug, Clone, Default)]
pub struct FlatTextSerializer {
    include_item_markers: bool,
}

impl FlatTextSerializer {
    /// Create a serializer emitting per-item banners.
    pub fn new() -> Self {
        Self {
            include_item_markers: true,
        }
    }

    /// Toggle per-item banners.
    pub fn with_item_markers(mut self, enabled: bool) -> Self {
        self.include_item_markers = enabled;
        self
    }

    fn item_lines(&self, category: Category, item: &TreeItem) -> Vec<String> {
        let mut lines = Vec::new();
        if self.include_item_markers {
            lines.push(banner(&format!("{} {}: {}", category.item_label(), item.index, item.name)));
        }
        for subsection in &item.subsections {
            subsection_lines(subsection, &mut lines);
        }
        lines
    }
}

fn subsection_lines(subsection: &Subsection, lines: &mut Vec<String>) {
    if subsection.is_empty() {
        return;
    }
    lines.push(format!("[{}]", subsection.title));
    match &subsection.content {
        SubsectionContent::Fields(fields) => {
            for field in fields {
                push_labeled(lines, &field.label, &field.value);
            }
        }
        SubsectionContent::Text(text) => {
            lines.extend(text.lines().map(|l| l.trim_end().to_string()));
        }
    }
}

impl ContextSerializer for FlatTextSerializer {
    fn serialize(&self, tree: &ContextTree) -> String {
        let mut blocks: Vec<String> = Vec::new();
        for section in tree.sections.iter().filter(|s| !s.is_empty()) {
            if let Some(title) = &section.title {
                blocks.push(banner(title));
            }
            for category in section.categories.iter().filter(|c| !c.items.is_empty()) {
                blocks.push(banner(category.label()));
                for item in &category.items {
                    blocks.push(self.item_lines(category.category, item).join("\n"));
                }
            }
        }
        blocks.join("\n\n")
    }

    fn serialize_item(&self, category: Category, item: &TreeItem) -> String {
        self.item_lines(category, item).join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractedField;
    use crate::tree::{TreeSection, LINKED_SECTION_TITLE};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree() -> ContextTree {
        let mut main = TreeSection::main();
        main.category_mut(Category::Characters).push(TreeItem::new(
            "Aria",
            0,
            vec![
                Subsection::fields("Identité", vec![ExtractedField::new("Nom", "Nom", json!("Aria"))]),
                Subsection::fields(
                    "Background",
                    vec![ExtractedField::new("Background.Relations", "Relations", json!("Bob"))],
                ),
            ],
        ));
        let mut linked = TreeSection::titled(LINKED_SECTION_TITLE);
        linked.category_mut(Category::Locations).push(TreeItem::new(
            "Port-Sable",
            0,
            vec![Subsection::text("Informations", "Nom: Port-Sable")],
        ));

        let mut tree = ContextTree::new();
        tree.push_section(main);
        tree.push_section(linked);
        tree
    }

    #[test]
    fn test_flat_rendering() {
        let text = FlatTextSerializer::new().serialize(&tree());
        let expected = "\
--- CHARACTERS ---

--- CHARACTER 1: Aria ---
[Identité]
Nom: Aria
[Background]
Relations: Bob

--- LINKED ELEMENTS ---

--- LOCATIONS ---

--- LOCATION 1: Port-Sable ---
[Informations]
Nom: Port-Sable";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_without_item_markers() {
        let text = FlatTextSerializer::new().with_item_markers(false).serialize(&tree());
        assert!(!text.contains("CHARACTER 1"));
        assert!(text.contains("--- CHARACTERS ---"));
        assert!(text.contains("Relations: Bob"));
    }

    #[test]
    fn test_empty_tree() {
        assert_eq!(FlatTextSerializer::new().serialize(&ContextTree::new()), "");
    }
}

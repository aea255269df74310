//! Narrative guides: the vision document and the macro/micro story
//! structures rendered as plain text for the guides section.

use serde_json::Value;
use tracing::debug;

use crate::serializer::value_lines;
use world_bible::{is_empty_value, Category, Repository};

/// Heading of the vision block.
pub const VISION_TITLE: &str = "Vision";

/// Which guides to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuideSelection {
    pub vision: bool,
    pub structures: bool,
}

impl GuideSelection {
    /// Every guide.
    pub fn all() -> Self {
        Self {
            vision: true,
            structures: true,
        }
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        !self.vision && !self.structures
    }
}

/// Renders guide documents from a repository.
pub struct NarrativeGuides<'a> {
    repository: &'a Repository,
}

impl<'a> NarrativeGuides<'a> {
    /// Create a renderer over a repository.
    pub fn new(repository: &'a Repository) -> Self {
        Self { repository }
    }

    /// The vision block, if the document has content.
    pub fn vision(&self) -> Option<String> {
        guide_block(VISION_TITLE, self.repository.vision())
    }

    /// Macro then micro structure blocks, if any has content.
    pub fn structures(&self) -> Option<String> {
        let blocks: Vec<String> = [Category::MacroStructure, Category::MicroStructure]
            .into_iter()
            .filter_map(|category| {
                let value = self.repository.structure(category)?;
                guide_block(structure_title(category), value)
            })
            .collect();
        (!blocks.is_empty()).then(|| blocks.join("\n\n"))
    }

    /// Selected guides joined by blank lines; empty when nothing applies.
    pub fn render(&self, selection: GuideSelection) -> String {
        let mut blocks = Vec::new();
        if selection.vision {
            blocks.extend(self.vision());
        }
        if selection.structures {
            blocks.extend(self.structures());
        }
        debug!(blocks = blocks.len(), "Narrative guides rendered");
        blocks.join("\n\n")
    }
}

fn structure_title(category: Category) -> &'static str {
    match category {
        Category::MacroStructure => "Structure macro",
        _ => "Structure micro",
    }
}

fn guide_block(title: &str, value: &Value) -> Option<String> {
    if is_empty_value(value) {
        return None;
    }
    let mut lines = vec![format!("[{title}]")];
    lines.extend(value_lines(value));
    Some(lines.join("\n"))
}

//! Hierarchical intermediate form shared by every output format.
//!
//! sections -> categories -> items -> titled subsections. Both the flat
//! text and the tag tree are rendered from the same [`ContextTree`], which
//! keeps their content identical.

use serde::{Deserialize, Serialize};

use crate::extract::ExtractedField;
use crate::organizer::OrganizedSection;
use world_bible::Category;

/// Title of the secondary section holding linked entities.
pub const LINKED_SECTION_TITLE: &str = "LINKED ELEMENTS";

/// Content of a subsection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SubsectionContent {
    /// Labeled field values.
    Fields(Vec<ExtractedField>),
    /// Pre-rendered `Label: Value` text.
    Text(String),
}

/// A titled part of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsection {
    pub title: String,
    pub content: SubsectionContent,
}

impl Subsection {
    /// Create a field subsection.
    pub fn fields(title: impl Into<String>, fields: Vec<ExtractedField>) -> Self {
        Self {
            title: title.into(),
            content: SubsectionContent::Fields(fields),
        }
    }

    /// Create a text subsection.
    pub fn text(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: SubsectionContent::Text(text.into()),
        }
    }

    /// Fields of a field subsection; empty for text.
    pub fn field_list(&self) -> &[ExtractedField] {
        match &self.content {
            SubsectionContent::Fields(fields) => fields,
            SubsectionContent::Text(_) => &[],
        }
    }

    /// Whether there is nothing to render.
    pub fn is_empty(&self) -> bool {
        match &self.content {
            SubsectionContent::Fields(fields) => fields.is_empty(),
            SubsectionContent::Text(text) => text.trim().is_empty(),
        }
    }
}

impl From<OrganizedSection> for Subsection {
    fn from(section: OrganizedSection) -> Self {
        Subsection::fields(section.title, section.fields)
    }
}

/// One entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeItem {
    pub name: String,
    /// 1-based position inside its category.
    pub index: usize,
    pub subsections: Vec<Subsection>,
    /// Cost of the item's rendered text.
    pub tokens: usize,
}

impl TreeItem {
    /// Create an item; empty subsections are dropped.
    pub fn new(name: impl Into<String>, index: usize, subsections: Vec<Subsection>) -> Self {
        Self {
            name: name.into(),
            index,
            subsections: subsections.into_iter().filter(|s| !s.is_empty()).collect(),
            tokens: 0,
        }
    }

    /// Every field of every field subsection.
    pub fn fields(&self) -> impl Iterator<Item = &ExtractedField> {
        self.subsections.iter().flat_map(Subsection::field_list)
    }
}

/// Entities of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeCategory {
    pub category: Category,
    pub items: Vec<TreeItem>,
}

impl TreeCategory {
    /// Create an empty category node.
    pub fn new(category: Category) -> Self {
        Self {
            category,
            items: Vec::new(),
        }
    }

    /// Append an item, numbering it after the existing ones.
    pub fn push(&mut self, mut item: TreeItem) {
        item.index = self.items.len() + 1;
        self.items.push(item);
    }

    /// Plural display label (`CHARACTERS`).
    pub fn label(&self) -> &'static str {
        self.category.display_label()
    }

    /// Summed item cost.
    pub fn tokens(&self) -> usize {
        self.items.iter().map(|i| i.tokens).sum()
    }
}

/// A top-level section; the main section has no title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeSection {
    pub title: Option<String>,
    pub categories: Vec<TreeCategory>,
}

impl TreeSection {
    /// Create an untitled section.
    pub fn main() -> Self {
        Self::default()
    }

    /// Create a titled section.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            categories: Vec::new(),
        }
    }

    /// Category node for `category`, created on first use.
    pub fn category_mut(&mut self, category: Category) -> &mut TreeCategory {
        let pos = match self.categories.iter().position(|c| c.category == category) {
            Some(pos) => pos,
            None => {
                self.categories.push(TreeCategory::new(category));
                self.categories.len() - 1
            }
        };
        &mut self.categories[pos]
    }

    /// Whether no category holds an item.
    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|c| c.items.is_empty())
    }

    /// Summed cost.
    pub fn tokens(&self) -> usize {
        self.categories.iter().map(TreeCategory::tokens).sum()
    }
}

/// The whole context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextTree {
    pub sections: Vec<TreeSection>,
}

impl ContextTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section unless it is empty.
    pub fn push_section(&mut self, section: TreeSection) {
        if !section.is_empty() {
            self.sections.push(section);
        }
    }

    /// Whether nothing would be rendered.
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(TreeSection::is_empty)
    }

    /// Every item, in render order.
    pub fn items(&self) -> impl Iterator<Item = &TreeItem> {
        self.sections
            .iter()
            .flat_map(|s| s.categories.iter())
            .flat_map(|c| c.items.iter())
    }

    /// Number of items.
    pub fn item_count(&self) -> usize {
        self.items().count()
    }

    /// Summed cost.
    pub fn tokens(&self) -> usize {
        self.sections.iter().map(TreeSection::tokens).sum()
    }
}

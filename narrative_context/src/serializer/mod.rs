//! Rendering of a [`ContextTree`] as flat text or as a tag tree.

mod escape;
mod flat;
mod tags;
mod titles;
mod values;

pub use escape::*;
pub use flat::*;
pub use tags::*;
pub use titles::*;
pub use values::*;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::tree::{ContextTree, TreeItem};
use world_bible::Category;

/// Output format of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Plain text with `--- LABEL ---` banners.
    #[default]
    FlatText,
    /// Markup with semantic element names.
    TagTree,
}

impl OutputFormat {
    /// Create the serializer for this format.
    pub fn serializer(&self, include_item_markers: bool) -> Box<dyn ContextSerializer> {
        match self {
            OutputFormat::FlatText => Box::new(FlatTextSerializer::new().with_item_markers(include_item_markers)),
            OutputFormat::TagTree => Box::new(TagTreeSerializer::new()),
        }
    }

    /// Whether the rendered document must be well-formed markup.
    pub fn is_markup(&self) -> bool {
        matches!(self, OutputFormat::TagTree)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" | "flat_text" | "text" => Ok(OutputFormat::FlatText),
            "tags" | "tag_tree" | "xml" => Ok(OutputFormat::TagTree),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// Renders a context tree.
pub trait ContextSerializer: Send + Sync {
    /// Render the whole tree; an empty tree renders as the empty string.
    fn serialize(&self, tree: &ContextTree) -> String;

    /// Render one item on its own, as it appears inside its category.
    fn serialize_item(&self, category: Category, item: &TreeItem) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("xml".parse::<OutputFormat>(), Ok(OutputFormat::TagTree));
        assert_eq!("Flat".parse::<OutputFormat>(), Ok(OutputFormat::FlatText));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_serde_names() {
        let json = serde_json::to_string(&OutputFormat::TagTree).unwrap();
        assert_eq!(json, "\"tag_tree\"");
    }
}

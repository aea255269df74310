use serde_json::Value;
use std::collections::HashSet;

use super::{
    embedded_json, escape_attr, escape_text, is_catch_all_title, normalize_tag_name, title_tag,
    CatchAllGroup, ContextSerializer,
};
use crate::text::normalize_field_name;
use crate::tree::{ContextTree, Subsection, SubsectionContent, TreeItem};
use world_bible::{is_empty_value, is_private_key, value_to_text, Category};

/// Root element of the rendered context.
pub const CONTEXT_TAG: &str = "context";

/// Element used for list entries.
pub const LIST_ITEM_TAG: &str = "item";

/// Element used for subsections without a semantic name.
pub const GENERIC_SECTION_TAG: &str = "section";

const NAME_LABELS: [&str; 2] = ["nom", "name"];

/// Indenting element writer.
#[derive(Debug, Default)]
struct TagWriter {
    out: String,
    depth: usize,
}

impl TagWriter {
    fn pad(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.pad();
        self.out.push('<');
        self.out.push_str(tag);
        for (key, value) in attrs {
            self.out.push_str(&format!(" {key}=\"{}\"", escape_attr(value)));
        }
        self.out.push_str(">\n");
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.pad();
        self.out.push_str(&format!("</{tag}>\n"));
    }

    fn leaf(&mut self, tag: &str, text: &str) {
        self.pad();
        self.out
            .push_str(&format!("<{tag}>{}</{tag}>\n", escape_text(text.trim())));
    }

    fn finish(self) -> String {
        self.out.trim_end().to_string()
    }
}

/// Renders the tree as nested elements with semantic names.
///
/// ```text
/// <context>
///   <characters>
///     <character name="Aria" index="1">
///       <identity>
///         <nom>Aria</nom>
///       </identity>
///     </character>
///   </characters>
/// </context>
/// ```
///
/// Catch-all subsections are not emitted under their own name: their
/// fields are moved into `identity`/`metadata`/`relationships`, skipping
/// fields already present in a structured subsection of the same item.
#[derive(Debug, Clone, Default)]
pub struct TagTreeSerializer;

impl TagTreeSerializer {
    /// Create a serializer.
    pub fn new() -> Self {
        Self
    }

    fn write_item(&self, w: &mut TagWriter, category: Category, item: &TreeItem) {
        let tag = normalize_tag_name(category.element_type());
        let index = item.index.to_string();
        w.open(&tag, &[("name", item.name.as_str()), ("index", index.as_str())]);

        let structured: HashSet<String> = item
            .subsections
            .iter()
            .filter(|s| !is_catch_all_title(&s.title))
            .flat_map(labels_of)
            .collect();

        for subsection in item.subsections.iter().filter(|s| !s.is_empty()) {
            if is_catch_all_title(&subsection.title) {
                write_catch_all(w, subsection, &item.name, &structured);
            } else {
                write_structured(w, subsection);
            }
        }

        w.close(&tag);
    }
}

fn labels_of(subsection: &Subsection) -> Vec<String> {
    match &subsection.content {
        SubsectionContent::Fields(fields) => fields.iter().map(|f| normalize_field_name(&f.label)).collect(),
        SubsectionContent::Text(text) => parse_labeled_lines(text)
            .into_iter()
            .map(|(label, _)| normalize_field_name(&label))
            .collect(),
    }
}

fn write_structured(w: &mut TagWriter, subsection: &Subsection) {
    let (tag, attrs): (&str, Vec<(&str, &str)>) = match title_tag(&subsection.title) {
        Some(tag) => (tag, Vec::new()),
        None => (GENERIC_SECTION_TAG, vec![("title", subsection.title.as_str())]),
    };
    match &subsection.content {
        SubsectionContent::Fields(fields) => {
            w.open(tag, &attrs);
            for field in fields {
                write_value(w, &normalize_tag_name(&field.label), &field.value);
            }
            w.close(tag);
        }
        SubsectionContent::Text(text) if attrs.is_empty() => w.leaf(tag, text),
        SubsectionContent::Text(text) => {
            w.open(tag, &attrs);
            w.leaf("text", text);
            w.close(tag);
        }
    }
}

fn write_catch_all(w: &mut TagWriter, subsection: &Subsection, item_name: &str, structured: &HashSet<String>) {
    let entries: Vec<(String, Value)> = match &subsection.content {
        SubsectionContent::Fields(fields) => fields.iter().map(|f| (f.label.clone(), f.value.clone())).collect(),
        SubsectionContent::Text(text) => parse_labeled_lines(text)
            .into_iter()
            .map(|(label, value)| (label, Value::String(value)))
            .collect(),
    };

    let mut groups: Vec<(CatchAllGroup, Vec<(String, Value)>)> =
        CatchAllGroup::ORDER.iter().map(|g| (*g, Vec::new())).collect();
    for (label, value) in entries {
        let normalized = normalize_field_name(&label);
        if structured.contains(&normalized) {
            continue;
        }
        if NAME_LABELS.contains(&normalized.as_str()) && value_to_text(&value).trim() == item_name {
            continue;
        }
        let group = CatchAllGroup::for_label(&label);
        if let Some((_, list)) = groups.iter_mut().find(|(g, _)| *g == group) {
            list.push((label, value));
        }
    }

    for (group, list) in groups.into_iter().filter(|(_, l)| !l.is_empty()) {
        w.open(group.tag(), &[]);
        for (label, value) in &list {
            write_value(w, &normalize_tag_name(label), value);
        }
        w.close(group.tag());
    }
}

/// Write a value as an element, destructuring maps, lists and embedded
/// JSON into child elements.
fn write_value(w: &mut TagWriter, tag: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => match embedded_json(s) {
            Some(parsed) => write_value(w, tag, &parsed),
            None => w.leaf(tag, s),
        },
        Value::Bool(_) | Value::Number(_) => w.leaf(tag, &value_to_text(value)),
        Value::Array(items) => {
            w.open(tag, &[]);
            for item in items.iter().filter(|v| !is_empty_value(v)) {
                write_value(w, LIST_ITEM_TAG, item);
            }
            w.close(tag);
        }
        Value::Object(map) => {
            w.open(tag, &[]);
            for (key, child) in map {
                if is_private_key(key) || is_empty_value(child) {
                    continue;
                }
                write_value(w, &normalize_tag_name(key), child);
            }
            w.close(tag);
        }
    }
}

/// Parse `Label: Value` lines; indented lines continue the previous value
/// and lines without a label are ignored.
pub fn parse_labeled_lines(text: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let continuation = line.starts_with(' ') || line.starts_with('\t');
        if continuation {
            if let Some((_, value)) = entries.last_mut() {
                value.push('\n');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((label, value)) = line.split_once(':') {
            let label = label.trim();
            if !label.is_empty() {
                entries.push((label.to_string(), value.trim().to_string()));
            }
        }
    }
    entries
}

impl ContextSerializer for TagTreeSerializer {
    fn serialize(&self, tree: &ContextTree) -> String {
        if tree.is_empty() {
            return String::new();
        }
        let mut w = TagWriter::default();
        w.open(CONTEXT_TAG, &[]);
        for section in tree.sections.iter().filter(|s| !s.is_empty()) {
            let section_tag = section.title.as_deref().map(normalize_tag_name);
            if let Some(tag) = &section_tag {
                w.open(tag, &[]);
            }
            for category in section.categories.iter().filter(|c| !c.items.is_empty()) {
                let container = normalize_tag_name(category.category.key());
                w.open(&container, &[]);
                for item in &category.items {
                    self.write_item(&mut w, category.category, item);
                }
                w.close(&container);
            }
            if let Some(tag) = &section_tag {
                w.close(tag);
            }
        }
        w.close(CONTEXT_TAG);
        w.finish()
    }

    fn serialize_item(&self, category: Category, item: &TreeItem) -> String {
        let mut w = TagWriter::default();
        self.write_item(&mut w, category, item);
        w.finish()
    }
}

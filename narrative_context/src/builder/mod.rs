//! Context construction: selection -> entities -> fields -> tree -> text.
//!
//! For every requested entity the builder resolves the field paths
//! (detail mode, overrides, defaults), filters them against real data and
//! caller flags, removes redundant paths, extracts the values, organizes
//! them, and places the result in a [`ContextTree`]. The tree is then
//! rendered in the requested format and fitted to the budget.

mod budget;
mod request;

pub use budget::*;
pub use request::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::dedup::Deduplicator;
use crate::extract::FieldExtractor;
use crate::fields::{DetailMode, FieldManager};
use crate::organizer::Organizer;
use crate::serializer::{ContextSerializer, OutputFormat};
use crate::tree::{ContextTree, Subsection, TreeItem, TreeSection, LINKED_SECTION_TITLE};
use crate::truncator::Truncator;
use world_bible::{normalize_name, Category, CategoryResolver, Entity, Linker, Repository};

/// Cost of one rendered entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCost {
    pub category: Category,
    pub name: String,
    pub tokens: usize,
}

/// A requested entity that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingEntity {
    /// Category key as requested.
    pub category: String,
    pub name: String,
}

/// Outcome of a context build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    /// The organized content, after budget fitting.
    pub tree: ContextTree,
    /// Rendered context.
    pub text: String,
    pub format: OutputFormat,
    /// Cost of `text`.
    pub tokens: usize,
    /// Cost of every rendered entity, in render order.
    pub items: Vec<ItemCost>,
    /// Requested entities absent from the knowledge base.
    pub missing: Vec<MissingEntity>,
    /// Selection keys naming no known category.
    pub unknown_categories: Vec<String>,
    /// Whether content was cut to fit the budget.
    pub truncated: bool,
    /// Entities dropped to fit the budget.
    pub dropped: Vec<String>,
}

impl BuildResult {
    /// Summed entity cost per category, in render order.
    pub fn category_tokens(&self) -> Vec<(Category, usize)> {
        let mut totals: Vec<(Category, usize)> = Vec::new();
        for item in &self.items {
            match totals.iter_mut().find(|(c, _)| *c == item.category) {
                Some((_, total)) => *total += item.tokens,
                None => totals.push((item.category, item.tokens)),
            }
        }
        totals
    }

    /// Whether nothing was rendered.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Builds the context section from a repository.
pub struct ContextBuilder<'a> {
    repository: &'a Repository,
    fields: &'a FieldManager,
    truncator: &'a Truncator,
    resolver: CategoryResolver,
    deduplicator: Deduplicator,
}

impl<'a> ContextBuilder<'a> {
    /// Create a builder.
    pub fn new(repository: &'a Repository, fields: &'a FieldManager, truncator: &'a Truncator) -> Self {
        Self {
            repository,
            fields,
            truncator,
            resolver: CategoryResolver::new(),
            deduplicator: Deduplicator::new(),
        }
    }

    /// Build the context for a request.
    ///
    /// Missing entities and unknown categories are logged and skipped.
    /// With a budget, flat text is cut head-first once; markup is fitted
    /// entity by entity so it stays well-formed.
    pub fn build(&self, request: &ContextRequest) -> BuildResult {
        let serializer = request.format.serializer(request.include_item_markers);
        let mut missing = Vec::new();
        let mut unknown_categories = Vec::new();
        let mut selected: HashSet<(Category, String)> = HashSet::new();

        let mut main = TreeSection::main();
        let ordered = self.resolver.prioritize(request.selection.entries());
        for (key, names) in &ordered {
            let Some(category) = self.resolver.resolve(key) else {
                warn!(category = %key, "Unknown category in selection, skipped");
                unknown_categories.push(key.clone());
                continue;
            };
            if category.is_structure() {
                debug!(category = %key, "Structure categories are rendered as guides, skipped");
                continue;
            }

            for name in names {
                if !selected.insert((category, normalize_name(name))) {
                    continue;
                }
                let Some(entity) = self.repository.get_by_name(category, name) else {
                    warn!(category = %key, name = %name, "Requested entity not found, omitted");
                    missing.push(MissingEntity {
                        category: key.clone(),
                        name: name.clone(),
                    });
                    continue;
                };
                let display_name = self.repository.entity_name(category, entity).unwrap_or(name);
                let mode = request.detail_mode(name);
                let item = self.build_item(category, entity, display_name, mode, request);
                main.category_mut(category).push(item);
            }
        }

        let mut tree = ContextTree::new();
        tree.push_section(main);
        if request.expand_links {
            tree.push_section(self.linked_section(&ordered, &selected, request));
        }

        let mut truncated = false;
        let mut dropped = Vec::new();
        if let (Some(budget), true) = (request.max_tokens, request.format.is_markup()) {
            let (fitted, report) = fit_tree(tree, budget, serializer.as_ref(), self.truncator);
            tree = fitted;
            truncated = report.truncated;
            dropped = report.dropped;
        }
        self.measure_items(&mut tree, serializer.as_ref());

        let mut text = serializer.serialize(&tree);
        if let (Some(budget), false) = (request.max_tokens, request.format.is_markup()) {
            if !self.truncator.fits(&text, budget) {
                text = self.truncator.truncate(&text, budget);
                truncated = true;
            }
        }
        let tokens = self.truncator.cost(&text);

        let items = tree
            .sections
            .iter()
            .flat_map(|s| s.categories.iter())
            .flat_map(|c| {
                c.items.iter().map(move |i| ItemCost {
                    category: c.category,
                    name: i.name.clone(),
                    tokens: i.tokens,
                })
            })
            .collect();

        info!(
            entities = tree.item_count(),
            missing = missing.len(),
            tokens,
            truncated,
            "Context built"
        );

        BuildResult {
            tree,
            text,
            format: request.format,
            tokens,
            items,
            missing,
            unknown_categories,
            truncated,
            dropped,
        }
    }

    /// Build one entity's item.
    pub fn build_item(
        &self,
        category: Category,
        entity: &Entity,
        name: &str,
        mode: DetailMode,
        request: &ContextRequest,
    ) -> TreeItem {
        let element_type = category.element_type();
        let paths = self
            .fields
            .resolve_fields(element_type, mode, request.field_override(element_type))
            .unwrap_or_else(|| self.fields.default_paths(element_type, entity));
        let paths = self.fields.filter_by_condition(
            element_type,
            paths,
            &request.flags,
            self.repository.entities(category),
        );
        let config = self.fields.config();
        let paths = self.deduplicator.dedupe_with_fallbacks(entity, &paths, |path| {
            config
                .descriptor_for(element_type, path)
                .and_then(|d| d.fallback_path.as_ref())
        });

        let extracted = FieldExtractor::new(config).extract(element_type, entity, &paths);
        let sections = Organizer::new(request.organization).organize(element_type, extracted, self.fields.config());
        debug!(
            category = %category,
            name,
            sections = sections.len(),
            "Entity organized"
        );
        TreeItem::new(name, 0, sections.into_iter().map(Subsection::from).collect())
    }

    fn linked_section(
        &self,
        ordered: &[(String, Vec<String>)],
        selected: &HashSet<(Category, String)>,
        request: &ContextRequest,
    ) -> TreeSection {
        let found = |category: Category| -> Vec<String> {
            ordered
                .iter()
                .filter(|(key, _)| self.resolver.resolve(key) == Some(category))
                .flat_map(|(_, names)| names.iter())
                .filter(|name| self.repository.contains(category, name))
                .cloned()
                .collect()
        };
        let character = found(Category::Characters).into_iter().next();
        let locations = found(Category::Locations);

        let linked = Linker::new(self.repository).linked(character.as_deref(), &locations);
        let mut section = TreeSection::titled(LINKED_SECTION_TITLE);
        for (category, names) in linked.iter() {
            for name in names {
                if selected.contains(&(category, normalize_name(name))) {
                    continue;
                }
                let Some(entity) = self.repository.find(category, name) else {
                    continue;
                };
                let item = self.build_item(category, entity, name, DetailMode::Excerpt, request);
                section.category_mut(category).push(item);
            }
        }
        debug!(linked = linked.len(), "Linked entities expanded");
        section
    }

    fn measure_items(&self, tree: &mut ContextTree, serializer: &dyn ContextSerializer) {
        for section in &mut tree.sections {
            for category in &mut section.categories {
                for item in &mut category.items {
                    item.tokens = self.truncator.cost(&serializer.serialize_item(category.category, item));
                }
            }
        }
    }
}

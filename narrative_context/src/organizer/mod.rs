//! Arranges extracted fields into titled sections.

mod buckets;

pub use buckets::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::extract::ExtractedField;
use crate::fields::FieldConfiguration;
use crate::text::normalize_field_name;

/// Number of fields kept by the minimal strategy when no essential field
/// was requested.
pub const MINIMAL_FALLBACK_COUNT: usize = 5;

/// Title of the single section produced by the default strategy.
pub const DEFAULT_SECTION_TITLE: &str = "Informations";

/// How selected fields are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationMode {
    /// Linear path order in one section.
    #[default]
    Default,
    /// Fixed thematic buckets.
    Narrative,
    /// Essential fields only.
    Minimal,
}

impl OrganizationMode {
    /// Request-surface name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationMode::Default => "default",
            OrganizationMode::Narrative => "narrative",
            OrganizationMode::Minimal => "minimal",
        }
    }
}

impl FromStr for OrganizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" | "flat" => Ok(OrganizationMode::Default),
            "narrative" => Ok(OrganizationMode::Narrative),
            "minimal" => Ok(OrganizationMode::Minimal),
            other => Err(format!("unknown organization mode '{other}'")),
        }
    }
}

/// A titled group of fields for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizedSection {
    pub title: String,
    pub fields: Vec<ExtractedField>,
}

impl OrganizedSection {
    /// Create a section.
    pub fn new(title: impl Into<String>, fields: Vec<ExtractedField>) -> Self {
        Self {
            title: title.into(),
            fields,
        }
    }
}

/// Groups an entity's fields according to an [`OrganizationMode`].
#[derive(Debug, Clone)]
pub struct Organizer {
    mode: OrganizationMode,
    minimal_fallback: usize,
}

impl Organizer {
    /// Create an organizer for a mode.
    pub fn new(mode: OrganizationMode) -> Self {
        Self {
            mode,
            minimal_fallback: MINIMAL_FALLBACK_COUNT,
        }
    }

    /// Set how many fields the minimal strategy keeps when none is essential.
    pub fn with_minimal_fallback(mut self, count: usize) -> Self {
        self.minimal_fallback = count.max(1);
        self
    }

    /// The active mode.
    pub fn mode(&self) -> OrganizationMode {
        self.mode
    }

    /// Organize fields; empty sections are never returned.
    pub fn organize(
        &self,
        element_type: &str,
        fields: Vec<ExtractedField>,
        config: &FieldConfiguration,
    ) -> Vec<OrganizedSection> {
        if fields.is_empty() {
            return Vec::new();
        }
        match self.mode {
            OrganizationMode::Default => vec![OrganizedSection::new(DEFAULT_SECTION_TITLE, fields)],
            OrganizationMode::Narrative => organize_narrative(fields),
            OrganizationMode::Minimal => {
                let kept = self.minimal_fields(element_type, fields, config);
                vec![OrganizedSection::new(DEFAULT_SECTION_TITLE, kept)]
            }
        }
    }

    fn minimal_fields(
        &self,
        element_type: &str,
        fields: Vec<ExtractedField>,
        config: &FieldConfiguration,
    ) -> Vec<ExtractedField> {
        let configured: HashSet<_> = config.essential_paths(element_type).into_iter().cloned().collect();
        let essential: Vec<ExtractedField> = fields
            .iter()
            .filter(|f| configured.contains(&f.path) || is_builtin_essential(element_type, &f.path))
            .cloned()
            .collect();
        if essential.is_empty() {
            fields.into_iter().take(self.minimal_fallback).collect()
        } else {
            essential
        }
    }
}

fn organize_narrative(fields: Vec<ExtractedField>) -> Vec<OrganizedSection> {
    let mut buckets: Vec<(Bucket, Vec<ExtractedField>)> = Bucket::ORDER.iter().map(|b| (*b, Vec::new())).collect();
    for field in fields {
        let bucket = Bucket::for_path(&field.path);
        if let Some((_, list)) = buckets.iter_mut().find(|(b, _)| *b == bucket) {
            list.push(field);
        }
    }

    let structured: HashSet<String> = buckets
        .iter()
        .filter(|(b, _)| !b.is_catch_all())
        .flat_map(|(_, list)| list.iter().map(|f| normalize_field_name(&f.label)))
        .collect();

    buckets
        .into_iter()
        .map(|(bucket, list)| {
            let list = if bucket.is_catch_all() {
                list.into_iter()
                    .filter(|f| !structured.contains(&normalize_field_name(&f.label)))
                    .collect()
            } else {
                list
            };
            (bucket, list)
        })
        .filter(|(_, list)| !list.is_empty())
        .map(|(bucket, list)| OrganizedSection::new(bucket.title(), list))
        .collect()
}

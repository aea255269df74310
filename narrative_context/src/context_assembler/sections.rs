//! Sections of the prompt document.

use serde::{Deserialize, Serialize};

/// Kind of a prompt section, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    GlobalContract,
    TechnicalInstructions,
    Context,
    NarrativeGuides,
    Vocabulary,
    PreviousDialogue,
    SceneInstructions,
}

impl SectionKind {
    /// All kinds in document order.
    pub const ORDER: [SectionKind; 7] = [
        SectionKind::GlobalContract,
        SectionKind::TechnicalInstructions,
        SectionKind::Context,
        SectionKind::NarrativeGuides,
        SectionKind::Vocabulary,
        SectionKind::PreviousDialogue,
        SectionKind::SceneInstructions,
    ];

    /// Heading used in flat text.
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::GlobalContract => "CONTRAT GLOBAL",
            SectionKind::TechnicalInstructions => "INSTRUCTIONS TECHNIQUES",
            SectionKind::Context => "CONTEXTE",
            SectionKind::NarrativeGuides => "GUIDES NARRATIFS",
            SectionKind::Vocabulary => "VOCABULAIRE",
            SectionKind::PreviousDialogue => "DIALOGUE PRÉCÉDENT",
            SectionKind::SceneInstructions => "INSTRUCTIONS DE SCÈNE",
        }
    }

    /// Element name used in markup.
    pub fn tag(&self) -> &'static str {
        match self {
            SectionKind::GlobalContract => "global_contract",
            SectionKind::TechnicalInstructions => "technical_instructions",
            SectionKind::Context => "context_section",
            SectionKind::NarrativeGuides => "narrative_guides",
            SectionKind::Vocabulary => "vocabulary",
            SectionKind::PreviousDialogue => "previous_dialogue",
            SectionKind::SceneInstructions => "scene_instructions",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One section of the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSection {
    pub kind: SectionKind,
    pub content: String,
    /// Content is already markup and is embedded as is.
    #[serde(default)]
    pub markup: bool,
}

impl PromptSection {
    /// Create a plain-text section.
    pub fn text(kind: SectionKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            markup: false,
        }
    }

    /// Create a section holding rendered markup.
    pub fn markup(kind: SectionKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            markup: true,
        }
    }

    /// Whether the section has nothing to show.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Progress of one assembly attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyState {
    Empty,
    SectionsAppended,
    Rendered,
    Validated,
}

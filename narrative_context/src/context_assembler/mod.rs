//! Prompt Assembler - Combines independently built sections into the final
//! prompt document.
//!
//! Assembly moves through one type per state:
//! 1. **Empty / SectionsAppended**: [`PromptAssembler`] collects sections;
//!    sections without content are omitted
//! 2. **Rendered**: [`RenderedPrompt`] holds the document text in the
//!    configured format, cut to the budget for flat text
//! 3. **Validated**: [`PromptDocument`] is the checked document with its
//!    build id, cost and content hash
//!
//! Validation failure of a markup document is terminal for the attempt and
//! carries a [`MarkupDiagnostic`](crate::error::MarkupDiagnostic).

mod sections;

pub use sections::*;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ContextError;
use crate::markup::validate_markup;
use crate::serializer::{escape_text, OutputFormat};
use crate::truncator::Truncator;

/// Root element of a markup prompt.
pub const PROMPT_TAG: &str = "prompt";

/// Configuration of an assembly.
#[derive(Debug, Clone, Default)]
pub struct AssemblerConfig {
    /// Format of the rendered document.
    pub format: OutputFormat,

    /// Token budget of the whole document. Flat text is cut to it; markup
    /// is expected to be fitted before assembly.
    pub max_tokens: Option<usize>,
}

/// Collects prompt sections.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    config: AssemblerConfig,
    truncator: Truncator,
    sections: Vec<PromptSection>,
}

impl PromptAssembler {
    /// Create a new assembler with the given configuration.
    pub fn new(config: AssemblerConfig, truncator: Truncator) -> Self {
        Self {
            config,
            truncator,
            sections: Vec::new(),
        }
    }

    /// Create an assembler for unbudgeted flat text with the word-count
    /// oracle.
    pub fn with_defaults() -> Self {
        Self::new(AssemblerConfig::default(), Truncator::default())
    }

    /// Current state.
    pub fn state(&self) -> AssemblyState {
        if self.sections.is_empty() {
            AssemblyState::Empty
        } else {
            AssemblyState::SectionsAppended
        }
    }

    /// Append a section. Empty sections are dropped; a second section of
    /// the same kind replaces the first.
    pub fn push(&mut self, section: PromptSection) {
        if section.is_empty() {
            debug!(section = %section.kind, "Empty section omitted");
            return;
        }
        match self.sections.iter_mut().find(|s| s.kind == section.kind) {
            Some(existing) => {
                warn!(section = %section.kind, "Section appended twice, keeping the last one");
                *existing = section;
            }
            None => self.sections.push(section),
        }
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_section(mut self, section: PromptSection) -> Self {
        self.push(section);
        self
    }

    /// Sections appended so far.
    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    /// Render the sections in document order.
    pub fn render(self) -> RenderedPrompt {
        let mut sections = self.sections;
        sections.sort_by_key(|s| s.kind);

        let mut rendered = match self.config.format {
            OutputFormat::FlatText => render_flat(&sections),
            OutputFormat::TagTree => render_tags(&sections),
        };

        let mut truncated = false;
        if let Some(budget) = self.config.max_tokens {
            if !self.truncator.fits(&rendered, budget) {
                if self.config.format.is_markup() {
                    warn!(
                        budget,
                        tokens = self.truncator.cost(&rendered),
                        "Markup prompt over budget, left uncut"
                    );
                } else {
                    rendered = self.truncator.truncate(&rendered, budget);
                    truncated = true;
                }
            }
        }

        let tokens = self.truncator.cost(&rendered);
        debug!(sections = sections.len(), tokens, truncated, "Prompt rendered");
        RenderedPrompt {
            sections,
            rendered,
            format: self.config.format,
            tokens,
            truncated,
        }
    }
}

fn render_flat(sections: &[PromptSection]) -> String {
    sections
        .iter()
        .map(|s| format!("## {}\n{}", s.kind.title(), s.content.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_tags(sections: &[PromptSection]) -> String {
    let mut out = format!("<{PROMPT_TAG}>\n");
    for section in sections {
        out.push_str(&format!("  <{}>\n", section.kind.tag()));
        for line in section.content.trim_end().lines() {
            if section.markup {
                push_markup_line(&mut out, line);
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            out.push_str("    ");
            out.push_str(&escape_text(line.trim_end()));
            out.push('\n');
        }
        out.push_str(&format!("  </{}>\n", section.kind.tag()));
    }
    out.push_str(&format!("</{PROMPT_TAG}>"));
    out
}

/// Lines opening with an element are nested under the section; any other
/// line continues a text value and is kept as is.
fn push_markup_line(out: &mut String, line: &str) {
    if line.trim_start().starts_with('<') {
        out.push_str("    ");
    }
    out.push_str(line);
    out.push('\n');
}

/// A rendered, not yet validated prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    sections: Vec<PromptSection>,
    rendered: String,
    format: OutputFormat,
    tokens: usize,
    truncated: bool,
}

impl RenderedPrompt {
    /// Current state.
    pub fn state(&self) -> AssemblyState {
        AssemblyState::Rendered
    }

    /// The rendered text.
    pub fn text(&self) -> &str {
        &self.rendered
    }

    /// Cost of the rendered text.
    pub fn tokens(&self) -> usize {
        self.tokens
    }

    /// Check the document and seal it.
    ///
    /// Markup documents must be well-formed; flat text always passes.
    pub fn validate(self) -> Result<PromptDocument, ContextError> {
        if self.format.is_markup() {
            if let Err(diagnostic) = validate_markup(&self.rendered) {
                warn!(
                    line = diagnostic.line,
                    column = diagnostic.column,
                    message = %diagnostic.message,
                    "Prompt document failed validation"
                );
                return Err(diagnostic.into());
            }
        }

        let document = PromptDocument {
            id: Uuid::new_v4(),
            content_hash: content_hash(&self.rendered),
            sections: self.sections,
            rendered: self.rendered,
            format: self.format,
            total_tokens: self.tokens,
            truncated: self.truncated,
        };
        info!(
            id = %document.id,
            tokens = document.total_tokens,
            hash = %document.content_hash,
            "Prompt document ready"
        );
        Ok(document)
    }
}

/// The final, validated prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDocument {
    /// Build id, unique per assembly.
    pub id: Uuid,

    /// Sections in document order.
    pub sections: Vec<PromptSection>,

    /// The document text.
    pub rendered: String,

    pub format: OutputFormat,

    /// Cost of `rendered`.
    pub total_tokens: usize,

    /// Hex SHA-256 of `rendered`.
    pub content_hash: String,

    /// Whether the document was cut to the budget.
    pub truncated: bool,
}

impl PromptDocument {
    /// Current state.
    pub fn state(&self) -> AssemblyState {
        AssemblyState::Validated
    }

    /// Section of a kind.
    pub fn section(&self, kind: SectionKind) -> Option<&PromptSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// The document text.
    pub fn text(&self) -> &str {
        &self.rendered
    }

    /// Whether no section was kept.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Hex SHA-256 of a text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::truncator::TRUNCATION_MARKER;
    use pretty_assertions::assert_eq;

    fn assembler(format: OutputFormat, max_tokens: Option<usize>) -> PromptAssembler {
        PromptAssembler::new(AssemblerConfig { format, max_tokens }, Truncator::default())
    }

    #[test]
    fn test_sections_in_document_order() {
        let document = assembler(OutputFormat::FlatText, None)
            .with_section(PromptSection::text(SectionKind::SceneInstructions, "Aria entre."))
            .with_section(PromptSection::text(SectionKind::Vocabulary, "   "))
            .with_section(PromptSection::text(SectionKind::GlobalContract, "Reste en personnage."))
            .render()
            .validate()
            .unwrap();

        assert_eq!(
            document.text(),
            "## CONTRAT GLOBAL\nReste en personnage.\n\n## INSTRUCTIONS DE SCÈNE\nAria entre."
        );
        assert!(document.section(SectionKind::Vocabulary).is_none());
        assert_eq!(document.sections.len(), 2);
        assert_eq!(document.total_tokens, 12);
    }

    #[test]
    fn test_state_transitions() {
        let mut assembler = assembler(OutputFormat::FlatText, None);
        assert_eq!(assembler.state(), AssemblyState::Empty);
        assembler.push(PromptSection::text(SectionKind::Context, "Aria"));
        assert_eq!(assembler.state(), AssemblyState::SectionsAppended);
        let rendered = assembler.render();
        assert_eq!(rendered.state(), AssemblyState::Rendered);
        assert_eq!(rendered.validate().unwrap().state(), AssemblyState::Validated);
    }

    #[test]
    fn test_repeated_kind_replaced() {
        let assembler = assembler(OutputFormat::FlatText, None)
            .with_section(PromptSection::text(SectionKind::Context, "ancien"))
            .with_section(PromptSection::text(SectionKind::Context, "nouveau"));
        assert_eq!(assembler.sections().len(), 1);
        assert_eq!(assembler.sections()[0].content, "nouveau");
    }

    #[test]
    fn test_flat_budget_single_marker() {
        let context = (1..=40).map(|i| format!("mot{i}")).collect::<Vec<_>>().join(" ");
        let document = assembler(OutputFormat::FlatText, Some(12))
            .with_section(PromptSection::text(SectionKind::GlobalContract, "Reste en personnage."))
            .with_section(PromptSection::text(SectionKind::Context, context))
            .render()
            .validate()
            .unwrap();

        assert!(document.truncated);
        assert!(document.total_tokens <= 12);
        assert!(document.text().ends_with(TRUNCATION_MARKER));
        assert_eq!(document.text().matches(TRUNCATION_MARKER).count(), 1);
    }

    #[test]
    fn test_tag_document() {
        let document = assembler(OutputFormat::TagTree, None)
            .with_section(PromptSection::text(SectionKind::GlobalContract, "Bob & Cie <narrateurs>"))
            .with_section(PromptSection::markup(
                SectionKind::Context,
                "<context>\n  <characters>\n  </characters>\n</context>",
            ))
            .render()
            .validate()
            .unwrap();

        let expected = "\
<prompt>
  <global_contract>
    Bob &amp; Cie &lt;narrateurs&gt;
  </global_contract>
  <context_section>
    <context>
      <characters>
      </characters>
    </context>
  </context_section>
</prompt>";
        assert_eq!(document.text(), expected);
    }

    #[test]
    fn test_tag_document_keeps_multiline_values() {
        let document = assembler(OutputFormat::TagTree, None)
            .with_section(PromptSection::markup(
                SectionKind::Context,
                "<context>\n  <humeur>Calme\n\n  et posée</humeur>\n</context>",
            ))
            .render()
            .validate()
            .unwrap();

        assert!(document.text().contains("    <context>\n      <humeur>Calme\n\n  et posée</humeur>\n    </context>"));
    }

    #[test]
    fn test_invalid_markup_is_terminal() {
        let err = assembler(OutputFormat::TagTree, None)
            .with_section(PromptSection::markup(SectionKind::Context, "<context><a></context>"))
            .render()
            .validate()
            .unwrap_err();

        let diagnostic = err.diagnostic().unwrap();
        assert_eq!(diagnostic.line, 3);
        assert_eq!(diagnostic.column, 17);
        assert_eq!(diagnostic.excerpt, "</context>");
        assert!(diagnostic.document.starts_with("<prompt>"));
    }

    #[test]
    fn test_hash_is_content_based() {
        let build = || {
            assembler(OutputFormat::FlatText, None)
                .with_section(PromptSection::text(SectionKind::Context, "Aria"))
                .render()
                .validate()
                .unwrap()
        };
        let first = build();
        let second = build();
        assert_eq!(first.content_hash, second.content_hash);
        assert_ne!(first.id, second.id);
        assert_eq!(first.content_hash.len(), 64);
        assert_eq!(first.content_hash, content_hash(first.text()));
    }

    #[test]
    fn test_empty_tag_document_is_valid() {
        let document = assembler(OutputFormat::TagTree, None).render().validate().unwrap();
        assert!(document.is_empty());
        assert_eq!(document.text(), "<prompt>\n</prompt>");
    }
}

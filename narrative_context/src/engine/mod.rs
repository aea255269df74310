//! The prompt engine: one façade over loading, context construction and
//! assembly.
//!
//! The engine owns the field configuration, the truncator and, once
//! loaded, the knowledge-base repository. Every build takes its request
//! explicitly and leaves the engine unchanged, so one engine can serve
//! concurrent callers.

mod request;

pub use request::*;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::builder::{BuildResult, ContextBuilder, ContextRequest};
use crate::context_assembler::{AssemblerConfig, PromptAssembler, PromptDocument, PromptSection, SectionKind};
use crate::error::ContextError;
use crate::fields::{FieldConfiguration, FieldManager};
use crate::guides::NarrativeGuides;
use crate::logging::LogThrottle;
use crate::serializer::OutputFormat;
use crate::settings::EngineSettings;
use crate::truncator::Truncator;
use world_bible::{Loader, Repository, Snapshot};

/// A built prompt with the report of its context section.
#[derive(Debug, Clone)]
pub struct PromptBuild {
    pub document: PromptDocument,
    pub context: BuildResult,
}

/// Builds prompt documents from a knowledge base.
pub struct PromptEngine {
    settings: EngineSettings,
    fields: FieldManager,
    truncator: Truncator,
    repository: Option<Repository>,
}

impl PromptEngine {
    /// Create an engine; the knowledge base is not loaded yet.
    pub fn new(settings: EngineSettings) -> Self {
        let config = match &settings.field_config {
            Some(path) => FieldConfiguration::load(path),
            None => {
                debug!("No field configuration, using observed fields");
                FieldConfiguration::new()
            }
        };
        let fields = FieldManager::new(Arc::new(config))
            .with_priority_level(settings.priority_level)
            .with_throttle(LogThrottle::new(settings.log_throttle_interval()));
        let truncator = truncator_for(&settings);

        Self {
            settings,
            fields,
            truncator,
            repository: None,
        }
    }

    /// Create an engine and load its knowledge base.
    pub fn from_settings(settings: EngineSettings) -> Self {
        let mut engine = Self::new(settings);
        engine.load();
        engine
    }

    /// Replace the truncator.
    pub fn with_truncator(mut self, truncator: Truncator) -> Self {
        self.truncator = truncator;
        self
    }

    /// Replace the field configuration.
    pub fn with_field_configuration(mut self, config: FieldConfiguration) -> Self {
        self.fields = FieldManager::new(Arc::new(config))
            .with_priority_level(self.settings.priority_level)
            .with_throttle(LogThrottle::new(self.settings.log_throttle_interval()));
        self
    }

    /// Use an already built snapshot.
    pub fn with_snapshot(mut self, snapshot: Arc<Snapshot>) -> Self {
        self.set_snapshot(snapshot);
        self
    }

    /// Replace the knowledge base.
    pub fn set_snapshot(&mut self, snapshot: Arc<Snapshot>) {
        info!(entities = snapshot.entity_count(), "Knowledge base attached");
        self.repository = Some(Repository::new(snapshot));
    }

    /// Read the knowledge base from the configured directories.
    pub fn load(&mut self) {
        let snapshot = Loader::new(self.settings.loader_config()).load_all();
        self.set_snapshot(Arc::new(snapshot));
    }

    /// Whether a knowledge base is attached.
    pub fn is_initialized(&self) -> bool {
        self.repository.is_some()
    }

    /// The settings in use.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The truncator in use.
    pub fn truncator(&self) -> &Truncator {
        &self.truncator
    }

    /// The loaded repository.
    pub fn repository(&self) -> Result<&Repository, ContextError> {
        self.repository
            .as_ref()
            .ok_or(ContextError::NotInitialized("knowledge base not loaded"))
    }

    /// Build only the context section.
    pub fn build_context(&self, request: &ContextRequest) -> Result<BuildResult, ContextError> {
        let repository = self.repository()?;
        Ok(ContextBuilder::new(repository, &self.fields, &self.truncator).build(request))
    }

    /// Build a prompt document.
    pub fn build(&self, request: &PromptRequest) -> Result<PromptDocument, ContextError> {
        self.build_detailed(request).map(|build| build.document)
    }

    /// Build a prompt document and keep the context report.
    ///
    /// Flat text is cut once, as a whole, to the budget. Markup cannot be
    /// cut after rendering, so the context is fitted to what the other
    /// sections leave and refitted while the document still overflows.
    pub fn build_detailed(&self, request: &PromptRequest) -> Result<PromptBuild, ContextError> {
        let repository = self.repository()?;
        let format = request.format.unwrap_or(self.settings.format);
        let budget = request.max_tokens.or(self.settings.max_tokens);

        let sections = self.side_sections(repository, request, budget);

        let mut context_request = request.context.clone();
        context_request.format = format;
        context_request.include_item_markers &= self.settings.include_item_markers;
        let builder = ContextBuilder::new(repository, &self.fields, &self.truncator);

        let mut context_budget = match (format.is_markup(), budget) {
            (true, Some(budget)) => {
                let others = self.assembler(format, None, &sections).render().tokens();
                let wrapper = self.truncator.cost(&context_wrapper());
                let available = budget.saturating_sub(others + wrapper);
                debug!(budget, others, wrapper, available, "Context budget for markup prompt");
                Some(available)
            }
            _ => None,
        };

        loop {
            context_request.max_tokens = context_budget;
            let context = builder.build(&context_request);

            let mut assembler = self.assembler(format, budget.filter(|_| !format.is_markup()), &sections);
            assembler.push(if format.is_markup() {
                PromptSection::markup(SectionKind::Context, context.text.clone())
            } else {
                PromptSection::text(SectionKind::Context, context.text.clone())
            });
            let rendered = assembler.render();

            if let (Some(available), Some(budget)) = (context_budget, budget) {
                if rendered.tokens() > budget && available > 0 {
                    let over = rendered.tokens() - budget;
                    debug!(budget, tokens = rendered.tokens(), available, "Markup prompt over budget, refitting context");
                    context_budget = Some(available.saturating_sub(over.max(1)));
                    continue;
                }
            }

            let document = rendered.validate()?;
            if let Some(budget) = budget {
                if document.total_tokens > budget {
                    warn!(budget, tokens = document.total_tokens, "Prompt document over budget");
                }
            }
            return Ok(PromptBuild { document, context });
        }
    }

    fn assembler(&self, format: OutputFormat, budget: Option<usize>, sections: &[PromptSection]) -> PromptAssembler {
        let mut assembler = PromptAssembler::new(
            AssemblerConfig {
                format,
                max_tokens: budget,
            },
            self.truncator.clone(),
        );
        for section in sections {
            assembler.push(section.clone());
        }
        assembler
    }

    /// Every section except the context.
    fn side_sections(&self, repository: &Repository, request: &PromptRequest, budget: Option<usize>) -> Vec<PromptSection> {
        let mut sections = Vec::new();
        let mut push = |kind: SectionKind, text: Option<String>| {
            if let Some(text) = text {
                sections.push(PromptSection::text(kind, text));
            }
        };

        push(SectionKind::GlobalContract, self.settings.global_contract.clone());
        push(
            SectionKind::TechnicalInstructions,
            self.settings.technical_instructions.clone(),
        );

        let guides = request.guides();
        if !guides.is_empty() {
            push(
                SectionKind::NarrativeGuides,
                Some(NarrativeGuides::new(repository).render(guides)),
            );
        }
        push(SectionKind::Vocabulary, request.vocabulary.clone());

        let dialogue = request.previous_dialogue.as_ref().map(|dialogue| {
            let share = budget.map(|max| (max as f64 * self.settings.dialogue_share).floor() as usize);
            match share {
                Some(share) => self.truncator.truncate_dialogue(dialogue, share),
                None => dialogue.clone(),
            }
        });
        push(SectionKind::PreviousDialogue, dialogue);
        push(SectionKind::SceneInstructions, Some(request.scene_instruction.clone()));
        sections
    }
}

/// Lines wrapping the context inside a markup prompt, as rendered.
fn context_wrapper() -> String {
    let tag = SectionKind::Context.tag();
    format!("  <{tag}>\n  </{tag}>\n")
}

#[cfg(feature = "hf-tokenizer")]
fn truncator_for(settings: &EngineSettings) -> Truncator {
    use crate::truncator::{HfTokenizerOracle, TokenizerOracle};

    let oracle = settings.tokenizer.as_deref().and_then(|path| match HfTokenizerOracle::from_file(path) {
        Ok(oracle) => Some(Arc::new(oracle) as Arc<dyn TokenizerOracle>),
        Err(err) => {
            warn!(error = %err, "Tokenizer unavailable, using word count");
            None
        }
    });
    Truncator::with_optional_oracle(oracle)
}

#[cfg(not(feature = "hf-tokenizer"))]
fn truncator_for(settings: &EngineSettings) -> Truncator {
    if let Some(path) = &settings.tokenizer {
        warn!(
            tokenizer = %path.display(),
            "Built without the hf-tokenizer feature, using word count"
        );
    }
    Truncator::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Selection;
    use crate::markup::validate_markup;
    use crate::truncator::{TokenizerOracle, TRUNCATION_MARKER};
    use serde_json::json;
    use world_bible::Category;

    fn snapshot() -> Arc<Snapshot> {
        Arc::new(
            Snapshot::builder()
                .with_entities(
                    Category::Characters,
                    vec![
                        json!({"Nom": "Aria", "Résumé": "Guerrière du nord", "Background": {"Relations": "Bob"}}),
                        json!({"Nom": "Bob", "Résumé": "Pêcheur bavard et frère d'Aria"}),
                    ],
                )
                .with_vision(json!({"Ton": "Mélancolique"}))
                .build(),
        )
    }

    fn engine(settings: EngineSettings) -> PromptEngine {
        PromptEngine::new(settings).with_snapshot(snapshot())
    }

    #[test]
    fn test_not_initialized() {
        let engine = PromptEngine::new(EngineSettings::default());
        assert!(!engine.is_initialized());
        let err = engine
            .build(&PromptRequest::new(Selection::new(), "Scène"))
            .unwrap_err();
        assert!(matches!(err, ContextError::NotInitialized(_)));
    }

    #[test]
    fn test_flat_prompt() {
        let settings = EngineSettings {
            global_contract: Some("Reste en personnage.".to_string()),
            ..EngineSettings::default()
        };
        let request = PromptRequest::new(Selection::new().with("characters", ["Aria"]), "Aria arrive au port.")
            .with_vocabulary("Sable: la ville")
            .with_guides(true, false);
        let document = engine(settings).build(&request).unwrap();

        let text = document.text();
        let order: Vec<usize> = ["## CONTRAT GLOBAL", "## CONTEXTE", "## GUIDES NARRATIFS", "## VOCABULAIRE", "## INSTRUCTIONS DE SCÈNE"]
            .iter()
            .map(|heading| text.find(heading).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("--- CHARACTER 1: Aria ---"));
        assert!(text.contains("Ton: Mélancolique"));
        assert!(document.section(SectionKind::PreviousDialogue).is_none());
        assert!(!document.truncated);
    }

    #[test]
    fn test_flat_budget() {
        let request = PromptRequest::new(Selection::new().with("characters", ["Aria", "Bob"]), "Ils se disputent.")
            .with_max_tokens(15);
        let document = engine(EngineSettings::default()).build(&request).unwrap();

        assert!(document.truncated);
        assert!(document.total_tokens <= 15);
        assert!(document.text().ends_with(TRUNCATION_MARKER));
        assert_eq!(document.text().matches(TRUNCATION_MARKER).count(), 1);
    }

    #[test]
    fn test_tag_budget_fits_context() {
        let request = PromptRequest::new(Selection::new().with("characters", ["Aria", "Bob"]), "Ils se disputent.")
            .with_format(OutputFormat::TagTree)
            .with_max_tokens(30);
        let build = engine(EngineSettings::default()).build_detailed(&request).unwrap();

        assert!(build.document.total_tokens <= 30);
        assert!(validate_markup(build.document.text()).is_ok());
        assert!(build.context.truncated);
        assert!(build.document.text().contains("<scene_instructions>"));
    }

    /// One token per four characters, whitespace included.
    struct QuarterCharOracle;

    impl TokenizerOracle for QuarterCharOracle {
        fn name(&self) -> &str {
            "quarter-char"
        }

        fn count(&self, text: &str) -> usize {
            text.chars().count().div_ceil(4)
        }

        fn head<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
            match text.char_indices().nth(max_tokens * 4) {
                Some((idx, _)) => &text[..idx],
                None => text,
            }
        }

        fn tail<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
            let skip = text.chars().count().saturating_sub(max_tokens * 4);
            match text.char_indices().nth(skip) {
                Some((idx, _)) => &text[idx..],
                None => "",
            }
        }
    }

    #[test]
    fn test_tag_budget_holds_with_character_oracle() {
        let engine = engine(EngineSettings::default()).with_truncator(Truncator::new(Arc::new(QuarterCharOracle)));

        for budget in [60, 90, 200] {
            let request = PromptRequest::new(Selection::new().with("characters", ["Aria"]), "Ils se disputent.")
                .with_format(OutputFormat::TagTree)
                .with_max_tokens(budget);
            let document = engine.build(&request).unwrap();

            assert!(document.total_tokens <= budget, "{} > {budget}", document.total_tokens);
            assert_eq!(document.total_tokens, engine.truncator().cost(document.text()));
            assert!(validate_markup(document.text()).is_ok());
            assert!(document.text().contains("<scene_instructions>"));
        }

        let request = PromptRequest::new(Selection::new().with("characters", ["Aria"]), "Ils se disputent.")
            .with_format(OutputFormat::TagTree)
            .with_max_tokens(200);
        assert!(engine.build(&request).unwrap().text().contains(r#"name="Aria""#));
    }

    #[test]
    fn test_tag_document_keeps_multiline_value() {
        let snapshot = Snapshot::builder()
            .with_entity(Category::Characters, json!({"Nom": "Aria", "Humeur": "Calme\n\net posée"}))
            .build();
        let engine = PromptEngine::new(EngineSettings::default()).with_snapshot(Arc::new(snapshot));
        let request = PromptRequest::new(Selection::new().with("characters", ["Aria"]), "Scène.");

        let tags = engine.build(&request.clone().with_format(OutputFormat::TagTree)).unwrap();
        assert!(tags.text().contains("<humeur>Calme\n\net posée</humeur>"));
        let flat = engine.build(&request).unwrap();
        assert!(flat.text().contains("Humeur: Calme\n\n  et posée"));
    }

    #[test]
    fn test_previous_dialogue_keeps_latest_lines() {
        let dialogue = "ARIA: Bonjour.\nBOB: Salut, comment vas-tu ce matin ?\nARIA: Bien, merci.";
        let request = PromptRequest::new(Selection::new(), "Suite.")
            .with_previous_dialogue(dialogue)
            .with_max_tokens(40);
        let document = engine(EngineSettings::default()).build(&request).unwrap();

        let section = document.section(SectionKind::PreviousDialogue).unwrap();
        assert!(section.content.ends_with("ARIA: Bien, merci."));
        assert!(section.content.starts_with(TRUNCATION_MARKER));
        assert!(!section.content.contains("Bonjour"));
    }

    #[test]
    fn test_hash_stable_across_builds() {
        let engine = engine(EngineSettings::default());
        let request = PromptRequest::new(Selection::new().with("characters", ["Aria"]), "Scène.");
        let first = engine.build(&request).unwrap();
        let second = engine.build(&request).unwrap();
        assert_eq!(first.content_hash, second.content_hash);
        assert_ne!(first.id, second.id);
    }
}

use serde::{Deserialize, Serialize};

use crate::builder::{ContextRequest, Selection};
use crate::guides::GuideSelection;
use crate::serializer::OutputFormat;

/// Everything needed to build one prompt document.
///
/// `format` and `max_tokens` apply to the whole document and replace the
/// values carried by `context`; unset, they come from the engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptRequest {
    pub context: ContextRequest,
    pub format: Option<OutputFormat>,
    pub max_tokens: Option<usize>,
    /// What should happen in the scene.
    pub scene_instruction: String,
    /// Dialogue so far, oldest line first.
    pub previous_dialogue: Option<String>,
    /// Glossary of terms the model should use.
    pub vocabulary: Option<String>,
    pub include_vision: bool,
    pub include_structures: bool,
}

impl PromptRequest {
    /// Create a request for a selection and scene instruction.
    pub fn new(selection: Selection, scene_instruction: impl Into<String>) -> Self {
        Self {
            context: ContextRequest::new(selection),
            scene_instruction: scene_instruction.into(),
            ..Self::default()
        }
    }

    /// Replace the context request.
    pub fn with_context(mut self, context: ContextRequest) -> Self {
        self.context = context;
        self
    }

    /// Set the document format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the document budget.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the previous dialogue.
    pub fn with_previous_dialogue(mut self, dialogue: impl Into<String>) -> Self {
        self.previous_dialogue = Some(dialogue.into());
        self
    }

    /// Set the vocabulary.
    pub fn with_vocabulary(mut self, vocabulary: impl Into<String>) -> Self {
        self.vocabulary = Some(vocabulary.into());
        self
    }

    /// Include the vision and structure guides.
    pub fn with_guides(mut self, vision: bool, structures: bool) -> Self {
        self.include_vision = vision;
        self.include_structures = structures;
        self
    }

    /// Guides requested.
    pub fn guides(&self) -> GuideSelection {
        GuideSelection {
            vision: self.include_vision,
            structures: self.include_structures,
        }
    }
}

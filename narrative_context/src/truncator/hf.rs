use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{info, warn};

use super::{TokenizerOracle, WordCountOracle};
use crate::error::ContextError;

/// Exact counts from a `tokenizer.json` model.
///
/// Encoding failures fall back to the word count for that call.
pub struct HfTokenizerOracle {
    tokenizer: Tokenizer,
    name: String,
}

impl HfTokenizerOracle {
    /// Load a tokenizer file.
    pub fn from_file(path: &Path) -> Result<Self, ContextError> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| ContextError::Config {
            path: path.to_path_buf(),
            message: format!("tokenizer load: {e}"),
        })?;
        info!(tokenizer = %path.display(), "Tokenizer loaded");
        Ok(Self {
            tokenizer,
            name: path.display().to_string(),
        })
    }

    fn offsets(&self, text: &str) -> Option<Vec<(usize, usize)>> {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => Some(encoding.get_offsets().to_vec()),
            Err(err) => {
                warn!(error = %err, "Tokenizer failed, using word count");
                None
            }
        }
    }
}

impl TokenizerOracle for HfTokenizerOracle {
    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self, text: &str) -> usize {
        match self.offsets(text) {
            Some(offsets) => offsets.len(),
            None => WordCountOracle.count(text),
        }
    }

    fn head<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        let Some(offsets) = self.offsets(text) else {
            return WordCountOracle.head(text, max_tokens);
        };
        if offsets.len() <= max_tokens {
            return text;
        }
        if max_tokens == 0 {
            return "";
        }
        let end = offsets[max_tokens - 1].1;
        text.get(..end).unwrap_or("")
    }

    fn tail<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        let Some(offsets) = self.offsets(text) else {
            return WordCountOracle.tail(text, max_tokens);
        };
        if offsets.len() <= max_tokens {
            return text;
        }
        if max_tokens == 0 {
            return "";
        }
        let start = offsets[offsets.len() - max_tokens].0;
        text.get(start..).unwrap_or("")
    }
}

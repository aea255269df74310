//! Token cost measurement and budget truncation.
//!
//! Exact counts come from a [`TokenizerOracle`]; without one the
//! [`WordCountOracle`] counts whitespace-separated words.

#[cfg(feature = "hf-tokenizer")]
mod hf;
mod oracle;

#[cfg(feature = "hf-tokenizer")]
pub use hf::*;
pub use oracle::*;

use std::sync::Arc;
use tracing::debug;

/// Marker appended (or, for dialogue, prepended) to truncated text.
pub const TRUNCATION_MARKER: &str = "[...]";

/// Measures and cuts text against token budgets.
#[derive(Clone)]
pub struct Truncator {
    oracle: Arc<dyn TokenizerOracle>,
}

impl std::fmt::Debug for Truncator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Truncator")
            .field("oracle", &self.oracle.name())
            .finish()
    }
}

impl Default for Truncator {
    fn default() -> Self {
        Self::new(Arc::new(WordCountOracle))
    }
}

impl Truncator {
    /// Create a truncator over an oracle.
    pub fn new(oracle: Arc<dyn TokenizerOracle>) -> Self {
        Self { oracle }
    }

    /// Create a truncator using the oracle when present, the word count
    /// otherwise.
    pub fn with_optional_oracle(oracle: Option<Arc<dyn TokenizerOracle>>) -> Self {
        match oracle {
            Some(oracle) => Self::new(oracle),
            None => {
                debug!("No tokenizer available, using word count");
                Self::default()
            }
        }
    }

    /// The oracle in use.
    pub fn oracle(&self) -> &dyn TokenizerOracle {
        self.oracle.as_ref()
    }

    /// Token cost of `text`.
    pub fn cost(&self, text: &str) -> usize {
        self.oracle.count(text)
    }

    /// Whether `text` fits in `budget`.
    pub fn fits(&self, text: &str, budget: usize) -> bool {
        self.cost(text) <= budget
    }

    /// Cost of the truncation marker.
    pub fn marker_cost(&self) -> usize {
        self.cost(TRUNCATION_MARKER)
    }

    /// Keep the head of `text` within `budget`, ending with one marker.
    ///
    /// Text already within budget is returned unchanged, which makes the
    /// operation idempotent. An existing trailing marker is removed before
    /// cutting so markers never accumulate. A budget smaller than the
    /// marker yields the empty string.
    pub fn truncate(&self, text: &str, budget: usize) -> String {
        if self.fits(text, budget) {
            return text.to_string();
        }
        let marker_cost = self.marker_cost();
        if budget < marker_cost {
            return String::new();
        }

        let base = strip_trailing_marker(text);
        let mut keep = budget - marker_cost;
        loop {
            let head = self.oracle.head(base, keep);
            let head = head.trim_end();
            let candidate = if head.is_empty() {
                TRUNCATION_MARKER.to_string()
            } else {
                format!("{head} {TRUNCATION_MARKER}")
            };
            if keep == 0 || self.fits(&candidate, budget) {
                debug!(budget, original = self.cost(text), kept = self.cost(&candidate), "Text truncated");
                return candidate;
            }
            keep -= 1;
        }
    }

    /// Keep the most recent lines of a dialogue within `budget`.
    ///
    /// Lines are taken from the end while they fit; the result starts with
    /// the marker on its own line. When not even the last line fits, its
    /// tail is kept instead.
    pub fn truncate_dialogue(&self, text: &str, budget: usize) -> String {
        if self.fits(text, budget) {
            return text.to_string();
        }
        let marker_cost = self.marker_cost();
        if budget < marker_cost {
            return String::new();
        }

        let base = strip_leading_marker(text);
        let lines: Vec<&str> = base.lines().filter(|l| !l.trim().is_empty()).collect();
        let mut kept: Vec<&str> = Vec::new();
        for line in lines.iter().rev() {
            let mut trial = kept.clone();
            trial.insert(0, *line);
            if self.fits(&with_leading_marker(&trial.join("\n")), budget) {
                kept = trial;
            } else {
                break;
            }
        }

        if kept.is_empty() {
            let last = lines.last().copied().unwrap_or("");
            let mut keep = budget - marker_cost;
            loop {
                let tail = self.oracle.tail(last, keep);
                let candidate = with_leading_marker(tail.trim_start());
                if keep == 0 || self.fits(&candidate, budget) {
                    return candidate;
                }
                keep -= 1;
            }
        }

        let result = with_leading_marker(&kept.join("\n"));
        debug!(budget, kept_lines = kept.len(), total_lines = lines.len(), "Dialogue truncated");
        result
    }
}

fn strip_trailing_marker(text: &str) -> &str {
    let trimmed = text.trim_end();
    match trimmed.strip_suffix(TRUNCATION_MARKER) {
        Some(rest) => rest.trim_end(),
        None => trimmed,
    }
}

fn strip_leading_marker(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.strip_prefix(TRUNCATION_MARKER) {
        Some(rest) => rest.trim_start(),
        None => trimmed,
    }
}

fn with_leading_marker(body: &str) -> String {
    if body.is_empty() {
        TRUNCATION_MARKER.to_string()
    } else {
        format!("{TRUNCATION_MARKER}\n{body}")
    }
}

//! Whole-word matching of known names inside free text.

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use tracing::warn;

use crate::entities::normalize_name;

/// Finds occurrences of a fixed set of names in text.
///
/// Matching is case-insensitive, whole-word and runs on normalized text,
/// so typographic quotes in either the names or the text do not matter.
/// Longer names win over names they contain ("Port Aveugle" over "Port").
#[derive(Debug, Clone)]
pub struct NameMatcher {
    pattern: Option<Regex>,
    /// Lowercased normalized name -> original name.
    canonical: HashMap<String, String>,
}

impl NameMatcher {
    /// Build a matcher for the given names. Blank names are ignored.
    pub fn new<'n, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'n str>,
    {
        let mut canonical = HashMap::new();
        for name in names {
            let normalized = normalize_name(name);
            if normalized.is_empty() {
                continue;
            }
            canonical
                .entry(normalized.to_lowercase())
                .or_insert_with(|| name.to_string());
        }

        let mut keys: Vec<&String> = canonical.keys().collect();
        keys.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));

        let alternation = keys
            .iter()
            .map(|name| word_pattern(name))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = if alternation.is_empty() {
            None
        } else {
            match RegexBuilder::new(&format!("(?:{alternation})"))
                .case_insensitive(true)
                .build()
            {
                Ok(re) => Some(re),
                Err(err) => {
                    warn!(error = %err, "Failed to build name matcher");
                    None
                }
            }
        };

        Self { pattern, canonical }
    }

    /// Distinct names occurring in `text`, in order of first occurrence.
    pub fn find_all(&self, text: &str) -> Vec<String> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        let haystack = normalize_name(text);

        let mut found: Vec<String> = Vec::new();
        for m in pattern.find_iter(&haystack) {
            if let Some(name) = self.canonical.get(&m.as_str().to_lowercase()) {
                if !found.contains(name) {
                    found.push(name.clone());
                }
            }
        }
        found
    }

    /// Whether `name` occurs in `text`.
    pub fn contains(&self, text: &str, name: &str) -> bool {
        let wanted = normalize_name(name).to_lowercase();
        self.find_all(text)
            .iter()
            .any(|n| normalize_name(n).to_lowercase() == wanted)
    }

    /// Number of names the matcher knows.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// Whether the matcher knows no names.
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

/// Escape a name and add word boundaries on the sides that start/end with
/// a word character.
fn word_pattern(name: &str) -> String {
    let escaped = regex::escape(name);
    let starts_word = name.chars().next().is_some_and(is_word_char);
    let ends_word = name.chars().last().is_some_and(is_word_char);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        escaped,
        if ends_word { r"\b" } else { "" }
    )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_only() {
        let matcher = NameMatcher::new(["Bob", "Ann"]);
        assert_eq!(matcher.find_all("Bobby et Anne"), Vec::<String>::new());
        assert_eq!(matcher.find_all("Bob, Ann"), vec!["Bob", "Ann"]);
    }

    #[test]
    fn test_longest_name_wins() {
        let matcher = NameMatcher::new(["Port", "Port Aveugle"]);
        assert_eq!(matcher.find_all("Vers Port Aveugle."), vec!["Port Aveugle"]);
        assert_eq!(
            matcher.find_all("Port puis Port Aveugle"),
            vec!["Port", "Port Aveugle"]
        );
    }

    #[test]
    fn test_case_and_quote_insensitive() {
        let matcher = NameMatcher::new(["L'Ombre"]);
        assert!(matcher.contains("il craint l\u{2019}ombre", "L'Ombre"));
        assert_eq!(matcher.find_all("L\u{2019}OMBRE rôde"), vec!["L'Ombre"]);
    }

    #[test]
    fn test_empty_matcher() {
        let matcher = NameMatcher::new(["", "  "]);
        assert!(matcher.is_empty());
        assert!(matcher.find_all("anything").is_empty());
    }
}

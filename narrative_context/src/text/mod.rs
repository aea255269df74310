//! Text folding helpers shared by categorization and tag naming.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Remove diacritics (`"Écho"` -> `"Echo"`).
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Lowercase and strip diacritics, for keyword comparisons.
pub fn fold(text: &str) -> String {
    strip_diacritics(text).to_lowercase()
}

/// Split folded text into alphanumeric keywords of at least `min_len` chars.
pub fn keywords(text: &str, min_len: usize) -> Vec<String> {
    fold(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= min_len)
        .map(str::to_string)
        .collect()
}

/// Normalize a field label for duplicate detection: folded, with every run
/// of non-alphanumerics collapsed to a single underscore.
pub fn normalize_field_name(label: &str) -> String {
    let folded = fold(label);
    let mut out = String::with_capacity(folded.len());
    let mut pending = false;
    for c in folded.chars() {
        if c.is_alphanumeric() {
            if pending && !out.is_empty() {
                out.push('_');
            }
            pending = false;
            out.push(c);
        } else {
            pending = true;
        }
    }
    out
}

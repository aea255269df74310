//! Escaping and tag-name normalization for the tag tree.

use crate::text::strip_diacritics;

/// Tag used when a name normalizes to nothing.
pub const FALLBACK_TAG: &str = "field";

/// Escape text content (`&`, `<`, `>`).
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value (text escapes plus both quote kinds).
pub fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse [`escape_text`]/[`escape_attr`] for the five named entities
/// and the newline reference.
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#10;", "\n")
        .replace("&amp;", "&")
}

/// Turn arbitrary text into a valid element name.
///
/// Diacritics are stripped and the result lowercased; every run of
/// characters outside `[a-z0-9]` becomes one underscore; leading and
/// trailing underscores are trimmed; a leading digit gets an underscore
/// prefix.
pub fn normalize_tag_name(name: &str) -> String {
    let folded = strip_diacritics(name).to_lowercase();
    let mut out = String::with_capacity(folded.len());
    let mut pending = false;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            if pending && !out.is_empty() {
                out.push('_');
            }
            pending = false;
            out.push(c);
        } else {
            pending = true;
        }
    }
    if out.is_empty() {
        return FALLBACK_TAG.to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(escape_text("l'épée \"x\""), "l'épée \"x\"");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("L'\"Ombre\" & co"), "L&apos;&quot;Ombre&quot; &amp; co");
    }

    #[test]
    fn test_unescape_reverses_escape() {
        let raw = "<a href=\"x\">Tom & Jerry's</a>\nfin";
        assert_eq!(unescape(&escape_attr(raw)), raw);
        assert_eq!(unescape(&escape_text(raw)), raw);
        assert_eq!(unescape("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_normalize_tag_name() {
        assert_eq!(normalize_tag_name("Caractérisation"), "caracterisation");
        assert_eq!(normalize_tag_name("Background - Relations"), "background_relations");
        assert_eq!(normalize_tag_name("  Âge (années) "), "age_annees");
        assert_eq!(normalize_tag_name("1er acte"), "_1er_acte");
        assert_eq!(normalize_tag_name("!!!"), FALLBACK_TAG);
        assert_eq!(normalize_tag_name("日本"), FALLBACK_TAG);
    }
}

//! Well-formedness check of rendered tag documents.
//!
//! Covers what the serializers emit: nested elements with quoted
//! attributes, self-closing elements, text with entity references,
//! comments and processing instructions. Not a full XML parser.

use crate::error::MarkupDiagnostic;

/// Maximum length, in characters, of a diagnostic excerpt.
pub const EXCERPT_LEN: usize = 40;

const NAMED_ENTITIES: [&str; 5] = ["amp", "lt", "gt", "quot", "apos"];

/// Check that `document` is a single well-formed element tree.
pub fn validate_markup(document: &str) -> Result<(), MarkupDiagnostic> {
    Validator::new(document).run()
}

struct Validator<'a> {
    doc: &'a str,
    pos: usize,
    stack: Vec<&'a str>,
    root_seen: bool,
}

impl<'a> Validator<'a> {
    fn new(doc: &'a str) -> Self {
        Self {
            doc,
            pos: 0,
            stack: Vec::new(),
            root_seen: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.doc[self.pos..]
    }

    fn fail(&self, at: usize, message: impl Into<String>) -> MarkupDiagnostic {
        diagnostic_at(self.doc, at, message)
    }

    fn run(mut self) -> Result<(), MarkupDiagnostic> {
        while self.pos < self.doc.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.skip_past("-->", "Unterminated comment")?;
            } else if rest.starts_with("<?") {
                self.skip_past("?>", "Unterminated processing instruction")?;
            } else if rest.starts_with("</") {
                self.closing_tag()?;
            } else if rest.starts_with('<') {
                self.opening_tag()?;
            } else {
                self.text()?;
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(self.fail(self.doc.len(), format!("Unclosed element <{open}>")));
        }
        if !self.root_seen {
            return Err(self.fail(0, "Document has no root element"));
        }
        Ok(())
    }

    fn skip_past(&mut self, terminator: &str, message: &str) -> Result<(), MarkupDiagnostic> {
        match self.rest().find(terminator) {
            Some(idx) => {
                self.pos += idx + terminator.len();
                Ok(())
            }
            None => Err(self.fail(self.pos, message)),
        }
    }

    fn name(&mut self) -> Result<&'a str, MarkupDiagnostic> {
        let start = self.pos;
        let rest = self.rest();
        let mut end = 0;
        for (idx, c) in rest.char_indices() {
            let valid = if idx == 0 {
                c.is_alphabetic() || c == '_' || c == ':'
            } else {
                c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.')
            };
            if !valid {
                break;
            }
            end = idx + c.len_utf8();
        }
        if end == 0 {
            return Err(self.fail(start, "Invalid element or attribute name"));
        }
        self.pos += end;
        Ok(&self.doc[start..start + end])
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn expect(&mut self, token: char, message: &str) -> Result<(), MarkupDiagnostic> {
        if self.rest().starts_with(token) {
            self.pos += token.len_utf8();
            Ok(())
        } else {
            Err(self.fail(self.pos, message))
        }
    }

    fn opening_tag(&mut self) -> Result<(), MarkupDiagnostic> {
        let tag_start = self.pos;
        if self.root_seen && self.stack.is_empty() {
            return Err(self.fail(tag_start, "Content after the root element"));
        }
        self.pos += 1;
        let name = self.name()?;
        let mut seen_attrs: Vec<&str> = Vec::new();

        loop {
            let before_ws = self.pos;
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                self.root_seen = true;
                return Ok(());
            }
            if rest.starts_with('>') {
                self.pos += 1;
                self.stack.push(name);
                self.root_seen = true;
                return Ok(());
            }
            if rest.is_empty() {
                return Err(self.fail(tag_start, format!("Unterminated tag <{name}")));
            }
            if self.pos == before_ws {
                return Err(self.fail(self.pos, "Expected whitespace before attribute"));
            }

            let attr_start = self.pos;
            let attr = self.name()?;
            if seen_attrs.contains(&attr) {
                return Err(self.fail(attr_start, format!("Duplicate attribute '{attr}'")));
            }
            seen_attrs.push(attr);
            self.skip_whitespace();
            self.expect('=', "Expected '=' after attribute name")?;
            self.skip_whitespace();

            let quote = match self.rest().chars().next() {
                Some(q @ ('"' | '\'')) => q,
                _ => return Err(self.fail(self.pos, "Attribute value must be quoted")),
            };
            self.pos += 1;
            let value_start = self.pos;
            let Some(len) = self.rest().find(quote) else {
                return Err(self.fail(value_start, "Unterminated attribute value"));
            };
            let value = &self.doc[value_start..value_start + len];
            if let Some(lt) = value.find('<') {
                return Err(self.fail(value_start + lt, "'<' not allowed in attribute value"));
            }
            check_entities(self.doc, value_start, value)?;
            self.pos = value_start + len + 1;
        }
    }

    fn closing_tag(&mut self) -> Result<(), MarkupDiagnostic> {
        let tag_start = self.pos;
        self.pos += 2;
        let name = self.name()?;
        self.skip_whitespace();
        self.expect('>', "Expected '>' to end closing tag")?;
        match self.stack.pop() {
            Some(open) if open == name => Ok(()),
            Some(open) => Err(self.fail(
                tag_start,
                format!("Mismatched closing tag </{name}>, expected </{open}>"),
            )),
            None => Err(self.fail(tag_start, format!("Closing tag </{name}> without opening tag"))),
        }
    }

    fn text(&mut self) -> Result<(), MarkupDiagnostic> {
        let start = self.pos;
        let len = self.rest().find('<').unwrap_or(self.rest().len());
        let text = &self.doc[start..start + len];
        if self.stack.is_empty() && !text.trim().is_empty() {
            let offset = text.len() - text.trim_start().len();
            let message = if self.root_seen {
                "Text after the root element"
            } else {
                "Text before the root element"
            };
            return Err(self.fail(start + offset, message));
        }
        check_entities(self.doc, start, text)?;
        self.pos = start + len;
        Ok(())
    }
}

/// Check every `&` in `text` (found at `offset` in `doc`) starts a valid
/// entity reference.
fn check_entities(doc: &str, offset: usize, text: &str) -> Result<(), MarkupDiagnostic> {
    for (idx, _) in text.match_indices('&') {
        let after = &text[idx + 1..];
        let Some(end) = after.find(';') else {
            return Err(diagnostic_at(doc, offset + idx, "Unescaped '&'"));
        };
        let entity = &after[..end];
        let valid = NAMED_ENTITIES.contains(&entity)
            || entity
                .strip_prefix("#x")
                .is_some_and(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
            || entity
                .strip_prefix('#')
                .is_some_and(|dec| !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit()));
        if !valid {
            return Err(diagnostic_at(doc, offset + idx, format!("Unknown entity '&{entity};'")));
        }
    }
    Ok(())
}

/// Build a diagnostic for byte offset `at` of `doc`.
///
/// Line and column are 1-based; the column counts characters. The excerpt
/// runs from the offending position to the end of its line.
pub fn diagnostic_at(doc: &str, at: usize, message: impl Into<String>) -> MarkupDiagnostic {
    let mut at = at.min(doc.len());
    while !doc.is_char_boundary(at) {
        at -= 1;
    }
    let before = &doc[..at];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = doc[line_start..at].chars().count() + 1;
    let excerpt: String = doc[at..]
        .lines()
        .next()
        .unwrap_or("")
        .chars()
        .take(EXCERPT_LEN)
        .collect();

    MarkupDiagnostic {
        line,
        column,
        message: message.into(),
        excerpt,
        document: doc.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_document() {
        let doc = "<?xml version=\"1.0\"?>\n<prompt>\n  <!-- note -->\n  <context a=\"x &amp; y\" b='2'>\n    <nom>Tom &lt;3 &#233;</nom>\n    <vide/>\n  </context>\n</prompt>\n";
        assert!(validate_markup(doc).is_ok());
    }

    #[test]
    fn test_mismatched_closing_tag() {
        let doc = "<a>\n  <b>texte</c>\n</a>";
        let diag = validate_markup(doc).unwrap_err();
        assert_eq!(diag.line, 2);
        assert_eq!(diag.column, 11);
        assert!(diag.message.contains("</c>"));
        assert_eq!(diag.excerpt, "</c>");
        assert_eq!(diag.document, doc);
    }

    #[test]
    fn test_unclosed_element() {
        let diag = validate_markup("<a><b></b>").unwrap_err();
        assert!(diag.message.contains("Unclosed element <a>"));
    }

    #[test]
    fn test_unescaped_ampersand() {
        let diag = validate_markup("<a>Bob & Cie</a>").unwrap_err();
        assert_eq!(diag.column, 8);
        assert_eq!(diag.message, "Unescaped '&'");
    }

    #[test]
    fn test_unknown_entity() {
        assert!(validate_markup("<a>&nbsp;</a>").is_err());
    }

    #[test]
    fn test_text_outside_root() {
        assert!(validate_markup("avant <a></a>").is_err());
        assert!(validate_markup("<a></a> après").is_err());
        assert!(validate_markup("<a></a><b></b>").is_err());
        assert!(validate_markup("\n<a></a>\n").is_ok());
    }

    #[test]
    fn test_attribute_errors() {
        assert!(validate_markup("<a x=1></a>").is_err());
        assert!(validate_markup("<a x=\"1\" x=\"2\"></a>").is_err());
        assert!(validate_markup("<a x=\"<\"></a>").is_err());
        assert!(validate_markup("<a x=\"1\"y=\"2\"></a>").is_err());
    }

    #[test]
    fn test_empty_document() {
        let diag = validate_markup("").unwrap_err();
        assert_eq!(diag.line, 1);
        assert_eq!(diag.column, 1);
    }

    #[test]
    fn test_invalid_name() {
        assert!(validate_markup("<1a></1a>").is_err());
    }
}

/// Source of token counts.
///
/// `head`/`tail` return the longest prefix/suffix of `text` costing at most
/// `max_tokens`, cut from the original string so spacing is preserved.
pub trait TokenizerOracle: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> usize;

    /// Longest prefix of at most `max_tokens` tokens.
    fn head<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str;

    /// Longest suffix of at most `max_tokens` tokens.
    fn tail<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str;
}

/// Counts whitespace-separated words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountOracle;

impl TokenizerOracle for WordCountOracle {
    fn name(&self) -> &str {
        "word-count"
    }

    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn head<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        if max_tokens == 0 {
            return "";
        }
        let mut seen = 0;
        let mut in_word = false;
        for (idx, c) in text.char_indices() {
            if c.is_whitespace() {
                if in_word {
                    seen += 1;
                    if seen == max_tokens {
                        return &text[..idx];
                    }
                }
                in_word = false;
            } else {
                in_word = true;
            }
        }
        text
    }

    fn tail<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        if max_tokens == 0 {
            return "";
        }
        let mut seen = 0;
        let mut in_word = false;
        for (idx, c) in text.char_indices().rev() {
            if c.is_whitespace() {
                if in_word {
                    seen += 1;
                    if seen == max_tokens {
                        return &text[idx + c.len_utf8()..];
                    }
                }
                in_word = false;
            } else {
                in_word = true;
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head() {
        let oracle = WordCountOracle;
        assert_eq!(oracle.head("un deux  trois", 2), "un deux");
        assert_eq!(oracle.head("  un deux", 1), "  un");
        assert_eq!(oracle.head("un deux", 5), "un deux");
        assert_eq!(oracle.head("un deux", 0), "");
    }

    #[test]
    fn test_tail() {
        let oracle = WordCountOracle;
        assert_eq!(oracle.tail("un deux  trois", 2), "deux  trois");
        assert_eq!(oracle.tail("été à là", 1), "là");
        assert_eq!(oracle.tail("un", 3), "un");
    }

    #[test]
    fn test_head_tail_costs() {
        let oracle = WordCountOracle;
        let text = "a b c d e f";
        for n in 0..8 {
            assert!(oracle.count(oracle.head(text, n)) <= n);
            assert!(oracle.count(oracle.tail(text, n)) <= n);
        }
    }
}

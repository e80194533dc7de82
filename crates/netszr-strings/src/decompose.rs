//! Decomposition heuristics.
//!
//! Strings are usually sent as parts of the identifiers they were collected
//! from (a path's file name, a prototype id's suffix). Adding those parts up
//! front raises the hit rate of the mapping. All output lands in a local
//! batch; nothing here touches the shared dictionary.

use std::collections::{BTreeSet, HashSet};

use crate::StringsConfig;

/// Characters trimmed from both ends of a string and treated as token
/// boundaries by [`split_symbols`].
pub(crate) const SYMBOLS: &[char] = &[
    '.', '\\', '/', ',', '#', '$', '?', '!', '@', '|', '&', '*', '(', ')', '^', '`', '"', '\'',
    '~', '[', ']', '{', '}', ':', ';', '-',
];

fn is_symbol(c: char) -> bool {
    SYMBOLS.contains(&c)
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Splits an identifier into tokens.
///
/// Boundaries fall before an uppercase ASCII letter that follows a word
/// character, before an ASCII digit that follows a non-digit word character,
/// before `_` that follows an ASCII alphanumeric, and on both sides of every
/// symbol. Empty tokens are never produced.
pub(crate) fn split_symbols(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (i, c) in s.char_indices() {
        if let Some(p) = prev {
            let boundary = (is_word(p) && c.is_ascii_uppercase())
                || (is_word(p) && !p.is_ascii_digit() && c.is_ascii_digit())
                || (p.is_ascii_alphanumeric() && c == '_')
                || is_symbol(c)
                || is_symbol(p);
            if boundary && i > start {
                tokens.push(&s[start..i]);
                start = i;
            }
        }
        prev = Some(c);
    }
    if start < s.len() {
        tokens.push(&s[start..]);
    }
    tokens
}

/// Accumulates a string and everything it decomposes into.
pub(crate) struct Expander<'a> {
    config: &'a StringsConfig,
    batch: BTreeSet<String>,
    expanded: HashSet<String>,
}

impl<'a> Expander<'a> {
    pub(crate) fn new(config: &'a StringsConfig) -> Self {
        Self {
            config,
            batch: BTreeSet::new(),
            expanded: HashSet::new(),
        }
    }

    /// Length filter, trim, `\r\n` normalization, length filter again.
    pub(crate) fn canonicalize(&self, s: &str) -> Option<String> {
        if !self.config.accepts(s) {
            return None;
        }
        let trimmed = s.trim();
        if !self.config.accepts(trimmed) {
            return None;
        }
        let normalized = trimmed.replace("\r\n", "\n");
        self.config.accepts(&normalized).then_some(normalized)
    }

    /// Adds `s` with its decomposition. Returns the canonical form, or
    /// `None` if `s` was rejected by the length filter.
    pub(crate) fn add(&mut self, s: &str) -> Option<String> {
        let canonical = self.canonicalize(s)?;
        if !self.expanded.insert(canonical.clone()) {
            return Some(canonical);
        }

        let trimmed = canonical.trim_matches(SYMBOLS);
        if trimmed != canonical {
            self.add(trimmed);
        }

        if canonical.contains('/') {
            self.expand_path(&canonical);
        } else if canonical.contains('_') {
            for part in canonical.split('_') {
                self.add(part);
            }
        } else if canonical.contains(' ') {
            for part in canonical.split(' ') {
                self.add(part);
            }
        } else {
            let tokens = split_symbols(&canonical);
            for token in &tokens {
                if *token != canonical {
                    self.add(token);
                }
            }
            self.push_spans(&tokens, "");
        }

        self.push(&canonical);
        Some(canonical)
    }

    fn expand_path(&mut self, path: &str) {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        for span in spans(&parts, "/", self.config.max_span_tokens) {
            if span.contains('.') {
                let dotted: Vec<&str> = span.split('.').filter(|p| !p.is_empty()).collect();
                self.push_spans(&dotted, ".");
            }
            self.push(&span);
        }
        for part in parts {
            self.add(part);
        }
    }

    fn push_spans(&mut self, parts: &[&str], sep: &str) {
        for span in spans(parts, sep, self.config.max_span_tokens) {
            self.push(&span);
        }
    }

    fn push(&mut self, s: &str) {
        if self.config.accepts(s) && !self.batch.contains(s) {
            self.batch.insert(s.to_owned());
        }
    }

    pub(crate) fn into_batch(self) -> BTreeSet<String> {
        self.batch
    }
}

/// Every contiguous run of `parts` joined by `sep`. Above `cap` parts only
/// single parts are produced.
fn spans(parts: &[&str], sep: &str, cap: usize) -> Vec<String> {
    let max_run = if parts.len() > cap { 1 } else { parts.len() };
    let mut out = Vec::new();
    for start in 0..parts.len() {
        let end = parts.len().min(start + max_run);
        for stop in start + 1..=end {
            out.push(parts[start..stop].join(sep));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(s: &str) -> BTreeSet<String> {
        let config = StringsConfig::default();
        let mut expander = Expander::new(&config);
        expander.add(s);
        expander.into_batch()
    }

    #[test]
    fn test_split_symbols_camel_case_and_digits() {
        assert_eq!(split_symbols("MetalWall2"), vec!["Metal", "Wall", "2"]);
    }

    #[test]
    fn test_split_symbols_symbols_are_own_tokens() {
        assert_eq!(
            split_symbols("base.Item-Box"),
            vec!["base", ".", "Item", "-", "Box"]
        );
    }

    #[test]
    fn test_split_symbols_leading_symbol_has_no_empty_token() {
        assert_eq!(split_symbols("#abc"), vec!["#", "abc"]);
    }

    #[test]
    fn test_split_symbols_digit_run_stays_together() {
        assert_eq!(split_symbols("Wall123"), vec!["Wall", "123"]);
    }

    #[test]
    fn test_canonicalize_trims_and_normalizes_newlines() {
        let config = StringsConfig::default();
        let expander = Expander::new(&config);
        assert_eq!(
            expander.canonicalize("  line\r\nnext  "),
            Some("line\nnext".to_owned())
        );
        assert_eq!(expander.canonicalize("   ab   "), None);
    }

    #[test]
    fn test_expand_path_with_underscore_component() {
        let batch = expand("textures/metal_wall");
        for expected in ["textures/metal_wall", "textures", "metal_wall", "metal", "wall"] {
            assert!(batch.contains(expected), "missing {expected}: {batch:?}");
        }
    }

    #[test]
    fn test_expand_path_dotted_spans() {
        let batch = expand("/Textures/Objects/crate.rsi");
        for expected in [
            "Textures/Objects/crate.rsi",
            "Objects/crate.rsi",
            "crate.rsi",
            "crate",
            "Textures/Objects",
        ] {
            assert!(batch.contains(expected), "missing {expected}: {batch:?}");
        }
        // "rsi" is too short to map.
        assert!(!batch.contains("rsi"));
    }

    #[test]
    fn test_expand_camel_case_spans() {
        let batch = expand("MetalWall2");
        for expected in ["MetalWall2", "Metal", "Wall", "MetalWall", "Wall2"] {
            assert!(batch.contains(expected), "missing {expected}: {batch:?}");
        }
    }

    #[test]
    fn test_expand_spaces() {
        let batch = expand("steel floor tile");
        for expected in ["steel floor tile", "steel", "floor", "tile"] {
            assert!(batch.contains(expected));
        }
    }

    #[test]
    fn test_expand_rejects_short_input() {
        assert!(expand("abc").is_empty());
    }

    #[test]
    fn test_spans_capped_above_limit() {
        let parts: Vec<&str> = (0..20).map(|_| "ab").collect();
        assert_eq!(spans(&parts, "", 16).len(), 20);
        assert_eq!(spans(&parts[..4], "", 16).len(), 10);
    }

    #[test]
    fn test_expand_long_token_run_stays_linear() {
        let input: String = (0..40).map(|i| format!("Part{i}")).collect();
        let batch = expand(&input);
        // Tokens plus the whole string, no spans.
        assert!(batch.len() < 100, "{} entries", batch.len());
        assert!(batch.contains(&input));
    }
}

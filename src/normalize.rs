//! Text canonicalization ahead of any matching.
//!
//! All lexicon lookups happen in normalized space: the lookup keys are
//! normalized with the same pipeline as the input line, so the two sides
//! always agree on spelling, case, and abbreviation expansion.
//!
//! The pipeline, in order: lowercase, NFD decomposition with combining-mark
//! removal, thousands-separator removal, punctuation-to-space (periods
//! survive, they carry abbreviation structure), whole-word abbreviation
//! expansion, literal typo correction, whitespace collapse, and an
//! optional tokenizer re-join when one is injected. One pass is a fixed
//! point: `normalize(normalize(x)) == normalize(x)` for a stable table
//! set.

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::caps::Tokenizer;
use crate::kb::KnowledgeBase;

/// Canonicalizes raw part descriptions.
///
/// Holds the abbreviation regexes precompiled; rebuild the normalizer
/// whenever the knowledge base's abbreviation or mistake tables change.
#[derive(Debug)]
pub struct TextNormalizer {
    abbreviations: Vec<(Regex, String)>,
    mistakes: Vec<(String, String)>,
}

impl TextNormalizer {
    /// Build a normalizer from the knowledge base's abbreviation and
    /// mistake tables.
    #[must_use]
    pub fn new(kb: &KnowledgeBase) -> Self {
        let abbreviations = kb
            .abbreviations
            .iter()
            .filter_map(|(abbr, full)| {
                let pattern = format!(r"\b{}\b", regex::escape(abbr));
                match Regex::new(&pattern) {
                    Ok(re) => Some((re, full.clone())),
                    Err(e) => {
                        log::warn!("skipping unusable abbreviation {:?}: {}", abbr, e);
                        None
                    }
                }
            })
            .collect();

        Self {
            abbreviations,
            mistakes: kb.mistake_pairs(),
        }
    }

    /// Canonicalize `text`. Empty input yields an empty string; malformed
    /// input degrades, it never errors.
    #[must_use]
    pub fn normalize(&self, text: &str, tokenizer: Option<&dyn Tokenizer>) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let lowered = text.to_lowercase();

        // NFD, then drop combining marks (niqqud and friends).
        let stripped: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();

        // Thousands separators go before the punctuation pass, which
        // would otherwise turn them into spaces and split the number.
        let stripped = strip_digit_commas(&stripped);

        // Everything that is not a word character, whitespace or a period
        // becomes a space.
        let mut cleaned = String::with_capacity(stripped.len());
        for c in stripped.chars() {
            if c.is_alphanumeric() || c == '_' || c == '.' || c.is_whitespace() {
                cleaned.push(c);
            } else {
                cleaned.push(' ');
            }
        }

        let mut normalized = cleaned;
        for (re, full) in &self.abbreviations {
            normalized = re.replace_all(&normalized, full.as_str()).into_owned();
        }
        for (mistake, correction) in &self.mistakes {
            normalized = normalized.replace(mistake.as_str(), correction.as_str());
        }

        normalized = collapse_whitespace(&normalized);

        if let Some(tok) = tokenizer {
            let tokens = tok.tokenize(&normalized);
            if !tokens.is_empty() {
                normalized = tokens.join(" ");
            }
        }

        normalized
    }
}

/// Remove every comma that sits between two digits ("1,200" -> "1200").
fn strip_digit_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ','
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())
        {
            continue;
        }
        out.push(c);
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn never_panics(text in ".*") {
            let n = TextNormalizer::new(&KnowledgeBase::seed());
            let _ = n.normalize(&text, None);
        }

        #[test]
        fn idempotent(text in "[א-תa-zA-Z0-9 .,x-]{0,60}") {
            let n = TextNormalizer::new(&KnowledgeBase::seed());
            let once = n.normalize(&text, None);
            let twice = n.normalize(&once, None);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn no_leading_or_trailing_space(text in ".{0,60}") {
            let n = TextNormalizer::new(&KnowledgeBase::seed());
            let out = n.normalize(&text, None);
            prop_assert_eq!(out.trim(), out.as_str());
        }
    }
}

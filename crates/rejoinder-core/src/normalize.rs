//! Text normalization matching the vocabulary's training-time convention.
//!
//! Pipeline, in order:
//! 1. NFD decomposition with non-spacing marks dropped (accent stripping)
//! 2. Lowercase and trim
//! 3. A space before each `.`, `!`, `?`
//! 4. Runs of characters outside `[a-zA-Z.!?]` become one space
//! 5. Whitespace collapsed and trimmed
//!
//! Repeated identical punctuation (`"!!"`) is reduced to a single token.

use crate::error::Result;
use regex::Regex;
use unicode_general_category::{get_general_category, GeneralCategory};
use unicode_normalization::UnicodeNormalization;

/// Sentence punctuation kept as standalone tokens.
const PUNCTUATION: [&str; 3] = [".", "!", "?"];

/// Compiled normalization patterns.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    /// Matches one sentence-final punctuation mark.
    punctuation: Regex,
    /// Matches a run of characters the vocabulary never contains.
    disallowed: Regex,
    /// Matches a whitespace run.
    whitespace: Regex,
}

impl TextNormalizer {
    /// Compile the patterns.
    pub fn new() -> Result<Self> {
        Ok(Self {
            punctuation: Regex::new(r"([.!?])")?,
            disallowed: Regex::new(r"[^a-zA-Z.!?]+")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Normalize free-form text. Never fails; may return an empty string.
    pub fn normalize(&self, raw: &str) -> String {
        let stripped: String = raw
            .nfd()
            .filter(|c| get_general_category(*c) != GeneralCategory::NonspacingMark)
            .collect();
        let lowered = stripped.to_lowercase();
        let spaced = self.punctuation.replace_all(lowered.trim(), " $1");
        let cleaned = self.disallowed.replace_all(&spaced, " ");
        let collapsed = self.whitespace.replace_all(&cleaned, " ");

        let mut tokens: Vec<&str> = Vec::new();
        for token in collapsed.trim().split(' ') {
            if PUNCTUATION.contains(&token) && tokens.last() == Some(&token) {
                continue;
            }
            tokens.push(token);
        }
        tokens.join(" ")
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2048))]

        /// Invariant: normalizing twice equals normalizing once
        #[test]
        fn invariant_idempotent(raw in "\\PC{0,24}") {
            let n = TextNormalizer::new().unwrap();
            let once = n.normalize(&raw);
            prop_assert_eq!(n.normalize(&once), once);
        }

        /// Invariant: output is lowercase ASCII words and `.!?` tokens,
        /// single-spaced and trimmed
        #[test]
        fn invariant_output_alphabet(raw in "\\PC{0,24}") {
            let out = TextNormalizer::new().unwrap().normalize(&raw);
            prop_assert!(
                out.chars().all(|c| c.is_ascii_lowercase() || ".!? ".contains(c)),
                "unexpected character in {:?}",
                out
            );
            prop_assert!(!out.contains("  "));
            prop_assert_eq!(out.trim(), out.as_str());
        }

        /// Invariant: no two adjacent tokens are the same punctuation mark
        #[test]
        fn invariant_no_repeated_punctuation(raw in "[a-c.!? ]{0,24}") {
            let out = TextNormalizer::new().unwrap().normalize(&raw);
            let tokens: Vec<&str> = out.split(' ').collect();
            for pair in tokens.windows(2) {
                prop_assert!(
                    !(PUNCTUATION.contains(&pair[0]) && pair[0] == pair[1]),
                    "repeated {:?} in {:?}",
                    pair[0],
                    out
                );
            }
        }
    }
}

//! Pluggable question distance.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use quorum_state::QuestionDigest;
use regex::Regex;

/// Distance between two question texts.
///
/// Implementations must return a finite value in `[0, 1]`, `0` for identical
/// questions, and the same value for `(a, b)` and `(b, a)`.
pub trait SimilarityMetric: Send + Sync {
    fn name(&self) -> &'static str;
    fn distance(&self, a: &str, b: &str) -> f64;
}

/// `1 - |A ∩ B| / |A ∪ B|` over lower-cased word tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenJaccard;

fn word_pattern() -> Option<&'static Regex> {
    static WORD: OnceLock<Option<Regex>> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w+").ok()).as_ref()
}

fn tokens(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    match word_pattern() {
        Some(re) => re.find_iter(&lowered).map(|m| m.as_str().to_string()).collect(),
        None => lowered.split_whitespace().map(str::to_string).collect(),
    }
}

impl SimilarityMetric for TokenJaccard {
    fn name(&self) -> &'static str {
        "token_jaccard"
    }

    fn distance(&self, a: &str, b: &str) -> f64 {
        let a = tokens(a);
        let b = tokens(b);
        let union = a.union(&b).count();
        if union == 0 {
            return 0.0;
        }
        let shared = a.intersection(&b).count();
        1.0 - shared as f64 / union as f64
    }
}

/// `0` when both questions share a digest, `1` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureMatch;

impl SimilarityMetric for SignatureMatch {
    fn name(&self) -> &'static str {
        "signature_match"
    }

    fn distance(&self, a: &str, b: &str) -> f64 {
        if QuestionDigest::of_text(a) == QuestionDigest::of_text(b) {
            0.0
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jaccard_bounds_and_symmetry() {
        let m = TokenJaccard;
        assert_eq!(m.distance("What is the capital of France?", "what is THE capital of france"), 0.0);
        assert_eq!(m.distance("red apple", "blue sky"), 1.0);

        let ab = m.distance("capital of france", "capital of spain");
        let ba = m.distance("capital of spain", "capital of france");
        assert_eq!(ab, ba);
        // {capital, of} shared out of {capital, of, france, spain}
        assert_eq!(ab, 0.5);
    }

    #[test]
    fn jaccard_empty_texts_are_identical() {
        assert_eq!(TokenJaccard.distance("", "  "), 0.0);
        assert_eq!(TokenJaccard.distance("", "word"), 1.0);
    }

    #[test]
    fn signature_match_uses_normalized_digest() {
        assert_eq!(SignatureMatch.distance("Who wrote Hamlet?", "who  wrote hamlet?"), 0.0);
        assert_eq!(SignatureMatch.distance("Who wrote Hamlet?", "who wrote Macbeth?"), 1.0);
    }
}

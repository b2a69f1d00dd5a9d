//! Deterministic text → token stream (spec §4.1).
//!
//! Used identically for indexing and querying, so the same function must be
//! called from both `scheduler` (indexing) and `search` (querying) — the
//! symmetry is what makes an exact-text query rank its own chunk first
//! (spec §8.6).

use std::collections::HashSet;
use std::sync::OnceLock;

/// Closed English stop-word set (spec glossary).
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "to", "of", "in", "on", "at",
    "for", "with", "by", "and", "or", "but", "if", "then", "else", "so", "not", "no", "do",
    "does", "did", "have", "has", "had", "i", "you", "he", "she", "it", "we", "they", "me",
    "him", "her", "us", "them", "this", "that", "these", "those",
];

fn stop_word_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Minimum surviving token length (shorter tokens are dropped as noise).
const MIN_TOKEN_LEN: usize = 2;

/// Tokenize `text`: lowercase, split on non-alphanumeric Unicode word
/// boundaries, drop tokens shorter than [`MIN_TOKEN_LEN`] and stop words.
///
/// Pure and allocation-only — no locale/ICU dependency, matching the rest of
/// the engine's determinism requirement (spec §8.2 for chunking applies
/// equally here: same input, same output, every time).
pub fn tokenize(text: &str) -> Vec<String> {
    let stops = stop_word_set();
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .filter(|s| s.chars().count() >= MIN_TOKEN_LEN && !stops.contains(s.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_splits_on_punctuation() {
        let toks = tokenize("Python is a language. Python is great!");
        assert_eq!(toks, vec!["python", "language", "python", "great"]);
    }

    #[test]
    fn drops_short_tokens_and_stop_words() {
        let toks = tokenize("I am at the of a b to it");
        assert!(toks.is_empty());
    }

    #[test]
    fn deterministic_across_calls() {
        let text = "Automobiles transport people between cities.";
        assert_eq!(tokenize(text), tokenize(text));
    }

    #[test]
    fn unicode_word_boundaries() {
        let toks = tokenize("café naïve résumé");
        assert_eq!(toks, vec!["café", "naïve", "résumé"]);
    }
}

//! Text normalization and phrase matching for relevance terms.

use unicode_normalization::UnicodeNormalization;

/// Normalize text for matching.
///
/// Decomposes to NFD so accents fall away as combining marks, lowercases,
/// drops everything that is not a letter, digit, or whitespace, then collapses
/// whitespace runs and trims. Total and deterministic.
#[must_use]
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .nfd()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns `true` when `needle` occurs anywhere inside `haystack`.
///
/// Both sides must already be normalized. Matching is substring based, not
/// token based, so `"unicorn party"` contains `"corn"`. Empty inputs never
/// match.
#[must_use]
pub fn phrase_match(haystack: &str, needle: &str) -> bool {
    !haystack.is_empty() && !needle.is_empty() && haystack.contains(needle)
}

/// Normalizes each term, dropping the ones that normalize to nothing.
pub(crate) fn normalize_terms<'a, I>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut out: Vec<String> = terms
        .into_iter()
        .map(|t| normalize(t))
        .filter(|t| !t.is_empty())
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

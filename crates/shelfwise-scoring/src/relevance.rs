//! Keep/drop classification of keyword signals against curated term sets.

use std::collections::BTreeSet;

use serde::Serialize;
use shelfwise_core::{
    Keyworded, ProductTypeEntry, ProductTypeMatch, RelevanceContext, RelevanceVocabulary,
};

use crate::terms::{normalize, normalize_terms, phrase_match};

/// How aggressively signals are filtered.
///
/// `Strict` and `Broad` run the same filter; they differ only in which terms
/// [`context_for_mode`] puts into the context. `All` bypasses filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Strict,
    Broad,
    All,
}

impl FilterMode {
    /// Case-insensitive parse; anything unrecognized is `Strict`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "broad" => Self::Broad,
            "all" => Self::All,
            _ => Self::Strict,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Broad => "broad",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one filter invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceOutcome<T> {
    pub filtered_signals: Vec<T>,
    pub filtered_out_count: usize,
    pub matched_product_type_keys: BTreeSet<String>,
    pub matched_occasion_terms: BTreeSet<String>,
    pub matched_exclude_terms: BTreeSet<String>,
}

impl<T> RelevanceOutcome<T> {
    fn empty(capacity: usize) -> Self {
        Self {
            filtered_signals: Vec::with_capacity(capacity),
            filtered_out_count: 0,
            matched_product_type_keys: BTreeSet::new(),
            matched_occasion_terms: BTreeSet::new(),
            matched_exclude_terms: BTreeSet::new(),
        }
    }
}

/// Builds a [`ProductTypeMatch`] whose synonyms are normalized,
/// de-duplicated, and include the key itself.
#[must_use]
pub fn product_type_match(entry: &ProductTypeEntry) -> ProductTypeMatch {
    let synonyms = std::iter::once(&entry.key)
        .chain(entry.synonyms.iter())
        .map(|s| normalize(s))
        .filter(|s| !s.is_empty())
        .collect();
    ProductTypeMatch {
        key: entry.key.trim().to_string(),
        synonyms,
    }
}

/// Populates the term sets for `mode` from the curated vocabulary.
///
/// * `Strict`: product types match on their key only; occasions are ignored.
/// * `Broad`: product types match on key and synonyms; occasions count.
/// * `All`: empty context.
///
/// Exclude terms apply in both strict and broad mode.
#[must_use]
pub fn context_for_mode(vocabulary: &RelevanceVocabulary, mode: FilterMode) -> RelevanceContext {
    match mode {
        FilterMode::All => RelevanceContext::default(),
        FilterMode::Strict => RelevanceContext {
            product_types: vocabulary
                .product_types
                .iter()
                .map(|entry| {
                    product_type_match(&ProductTypeEntry {
                        key: entry.key.clone(),
                        synonyms: Vec::new(),
                    })
                })
                .collect(),
            occasion_terms: Vec::new(),
            exclude_terms: normalize_terms(&vocabulary.exclude_terms),
        },
        FilterMode::Broad => RelevanceContext {
            product_types: vocabulary
                .product_types
                .iter()
                .map(product_type_match)
                .collect(),
            occasion_terms: normalize_terms(&vocabulary.occasion_terms),
            exclude_terms: normalize_terms(&vocabulary.exclude_terms),
        },
    }
}

/// Context terms normalized once per invocation.
struct PreparedContext<'a> {
    product_types: Vec<(&'a str, Vec<String>)>,
    occasion_terms: Vec<String>,
    exclude_terms: Vec<String>,
}

impl<'a> PreparedContext<'a> {
    fn new(context: &'a RelevanceContext) -> Self {
        Self {
            product_types: context
                .product_types
                .iter()
                .map(|pt| (pt.key.as_str(), normalize_terms(&pt.synonyms)))
                .collect(),
            occasion_terms: normalize_terms(&context.occasion_terms),
            exclude_terms: normalize_terms(&context.exclude_terms),
        }
    }
}

fn matching_terms<'t>(haystack: &str, terms: &'t [String]) -> Vec<&'t str> {
    terms
        .iter()
        .filter(|term| phrase_match(haystack, term))
        .map(String::as_str)
        .collect()
}

/// Splits `signals` into kept and dropped according to `context`.
///
/// Signals are visited in input order and kept signals retain that order.
/// An exclude match drops a signal no matter what else it matches; otherwise
/// it is kept if it matches at least one product type or occasion term.
/// `filtered_signals.len() + filtered_out_count` always equals the input length.
#[must_use]
pub fn filter_signals<T: Keyworded>(
    signals: Vec<T>,
    context: &RelevanceContext,
    mode: FilterMode,
) -> RelevanceOutcome<T> {
    let mut outcome = RelevanceOutcome::empty(signals.len());

    if mode == FilterMode::All {
        outcome.filtered_signals = signals;
        return outcome;
    }

    let prepared = PreparedContext::new(context);
    let total = signals.len();

    for signal in signals {
        let keyword = normalize(signal.keyword());

        let excluded = matching_terms(&keyword, &prepared.exclude_terms);
        if !excluded.is_empty() {
            outcome
                .matched_exclude_terms
                .extend(excluded.into_iter().map(str::to_string));
            outcome.filtered_out_count += 1;
            continue;
        }

        let type_keys: Vec<&str> = prepared
            .product_types
            .iter()
            .filter(|(_, synonyms)| synonyms.iter().any(|s| phrase_match(&keyword, s)))
            .map(|(key, _)| *key)
            .collect();
        let occasions = matching_terms(&keyword, &prepared.occasion_terms);

        if type_keys.is_empty() && occasions.is_empty() {
            outcome.filtered_out_count += 1;
            continue;
        }

        outcome
            .matched_product_type_keys
            .extend(type_keys.into_iter().map(str::to_string));
        outcome
            .matched_occasion_terms
            .extend(occasions.into_iter().map(str::to_string));
        outcome.filtered_signals.push(signal);
    }

    tracing::debug!(
        mode = %mode,
        total,
        kept = outcome.filtered_signals.len(),
        dropped = outcome.filtered_out_count,
        "relevance filter applied"
    );

    outcome
}

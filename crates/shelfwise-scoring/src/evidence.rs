//! Turning raw search evidence into scorable rows.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use shelfwise_core::{Evidence, ResearchTerm, ScorableRow, TtlCache};

use crate::terms::{normalize, phrase_match};

const DEFAULT_HALF_LIFE_DAYS: f64 = 30.0;
const UNDATED_RECENCY: f64 = 0.5;
const SAMPLE_URL_LIMIT: usize = 3;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Recency of a single evidence item in `[0, 1]`.
///
/// Halves every `half_life_days`. Undated items score 0.5; items dated in the
/// future score 1.0. A non-positive or non-finite half-life falls back to 30 days.
#[must_use]
pub fn recency_score(
    published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    half_life_days: f64,
) -> f64 {
    let Some(published_at) = published_at else {
        return UNDATED_RECENCY;
    };
    let half_life = if half_life_days.is_finite() && half_life_days > 0.0 {
        half_life_days
    } else {
        DEFAULT_HALF_LIFE_DAYS
    };

    #[allow(clippy::cast_precision_loss)]
    let age_days = (now - published_at).num_seconds() as f64 / SECONDS_PER_DAY;
    if age_days <= 0.0 {
        1.0
    } else {
        0.5_f64.powf(age_days / half_life).clamp(0.0, 1.0)
    }
}

/// Counts how each research term shows up across the gathered evidence.
///
/// A term is mentioned by an item when the item's normalized title and
/// snippet contain the normalized term. `sourcesCount` and `domainsCount` are
/// the distinct URLs and domains among mentioning items (at least 1), and
/// `recencyScore` is their mean recency, or 0 when nothing mentions the term.
/// Up to three mentioning URLs are attached as `sampleUrls`.
#[must_use]
pub fn rows_from_evidence(
    terms: &[ResearchTerm],
    evidence: &[Evidence],
    now: DateTime<Utc>,
    half_life_days: f64,
) -> Vec<ScorableRow> {
    let haystacks: Vec<String> = evidence
        .iter()
        .map(|e| normalize(&format!("{} {}", e.title, e.snippet)))
        .collect();

    terms
        .iter()
        .map(|term| {
            let needle = normalize(&term.keyword);
            let hits: Vec<&Evidence> = evidence
                .iter()
                .zip(&haystacks)
                .filter(|(_, haystack)| phrase_match(haystack, &needle))
                .map(|(e, _)| e)
                .collect();

            let urls: BTreeSet<&str> = hits.iter().map(|e| e.url.as_str()).collect();
            let domains: BTreeSet<String> =
                hits.iter().map(|e| e.domain.trim().to_lowercase()).collect();

            let recency = if hits.is_empty() {
                0.0
            } else {
                #[allow(clippy::cast_precision_loss)]
                let count = hits.len() as f64;
                hits.iter()
                    .map(|e| recency_score(e.published_at, now, half_life_days))
                    .sum::<f64>()
                    / count
            };

            let mut row = ScorableRow {
                cluster: term.cluster.clone(),
                mentions: Some(count_i64(hits.len())),
                recency_score: Some(recency),
                sources_count: Some(count_i64(urls.len()).max(1)),
                domains_count: Some(count_i64(domains.len()).max(1)),
                ..ScorableRow::new(term.keyword.clone())
            };
            if !hits.is_empty() {
                let samples: Vec<Value> = urls
                    .iter()
                    .take(SAMPLE_URL_LIMIT)
                    .map(|u| Value::from(*u))
                    .collect();
                row.extra
                    .insert("sampleUrls".to_string(), Value::Array(samples));
            }
            row
        })
        .collect()
}

fn count_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Looks up `query` in `cache`, calling `fetch` only on a miss.
///
/// Queries are cached under their normalized form so casing and punctuation
/// variants share an entry. Fetch errors are returned and not cached.
///
/// # Errors
///
/// Returns whatever `fetch` returns on a cache miss.
pub fn cached_search<E, F>(
    cache: &TtlCache<Vec<Evidence>>,
    query: &str,
    ttl: Duration,
    fetch: F,
) -> Result<Vec<Evidence>, E>
where
    F: FnOnce(&str) -> Result<Vec<Evidence>, E>,
{
    let key = normalize(query);
    if let Some(hit) = cache.get(&key) {
        tracing::debug!(query, results = hit.len(), "search cache hit");
        return Ok(hit);
    }

    let results = fetch(query)?;
    tracing::debug!(query, results = results.len(), "search cache miss");
    cache.set(&key, results.clone(), ttl);
    Ok(results)
}

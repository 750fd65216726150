//! Composite research scoring, ordering, and per-cluster ranking.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use shelfwise_core::{RankedRow, ScorableRow, ScoredRow};

const MENTIONS_CAP: f64 = 6.0;
const BASE_WEIGHT: f64 = 0.10;
const MENTIONS_WEIGHT: f64 = 0.60;
const RECENCY_WEIGHT: f64 = 0.25;
const DIVERSITY_WEIGHT: f64 = 0.05;

const DEFAULT_RECENCY: f64 = 0.5;
const UNKNOWN_CLUSTER: &str = "unknown";

static NON_ALNUM_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

/// Composite research score in `[0, 1]`.
///
/// `0.10 + 0.60 * mentions/6 + 0.25 * recency + 0.05 * diversity`, with
/// mentions capped at 6, recency clamped to `[0, 1]`, and diversity the ratio
/// of distinct domains to sources (sources floored at 3). Non-finite inputs
/// fall back to 0 mentions, 0.5 recency, and one source/domain.
#[must_use]
pub fn compute_research_score(
    mentions: f64,
    recency_score: f64,
    sources_count: f64,
    domains_count: f64,
) -> f64 {
    let mentions = finite_or(mentions, 0.0);
    let recency = finite_or(recency_score, DEFAULT_RECENCY).clamp(0.0, 1.0);
    let sources = finite_or(sources_count, 1.0).max(1.0);
    let domains = finite_or(domains_count, 1.0).max(1.0);

    let mentions_norm = (mentions.clamp(0.0, MENTIONS_CAP) / MENTIONS_CAP).clamp(0.0, 1.0);
    let diversity = (domains / sources.max(3.0)).clamp(0.0, 1.0);

    (BASE_WEIGHT
        + MENTIONS_WEIGHT * mentions_norm
        + RECENCY_WEIGHT * recency
        + DIVERSITY_WEIGHT * diversity)
        .clamp(0.0, 1.0)
}

#[allow(clippy::cast_precision_loss)]
fn row_score(row: &ScorableRow) -> f64 {
    compute_research_score(
        row.mentions.unwrap_or(0) as f64,
        row.recency_score.unwrap_or(DEFAULT_RECENCY),
        row.sources_count.unwrap_or(1) as f64,
        row.domains_count.unwrap_or(1) as f64,
    )
}

fn by_score_then_mentions(a: &ScoredRow, b: &ScoredRow) -> std::cmp::Ordering {
    b.research_score
        .total_cmp(&a.research_score)
        .then_with(|| b.mentions().cmp(&a.mentions()))
}

/// Scores every row and sorts best first, ties broken by more mentions.
///
/// Scoring output left over from an earlier pass is dropped from each row's
/// extra fields before the new score is attached.
#[must_use]
pub fn score_and_sort_rows(rows: Vec<ScorableRow>) -> Vec<ScoredRow> {
    let mut scored: Vec<ScoredRow> = rows
        .into_iter()
        .map(|mut row| {
            row.clear_derived_fields();
            ScoredRow {
                research_score: row_score(&row),
                row,
            }
        })
        .collect();
    scored.sort_by(by_score_then_mentions);
    scored
}

/// URL-safe cluster identifier.
///
/// Lowercases, drops quote characters, turns every run of characters outside
/// `[a-z0-9]` into one hyphen, and trims hyphens at the ends. A name with
/// nothing left maps to `unknown`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '`' | '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}'))
        .collect();
    let slug = NON_ALNUM_RUN.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        UNKNOWN_CLUSTER.to_string()
    } else {
        slug.to_string()
    }
}

/// Groups rows into clusters and ranks each cluster independently.
///
/// Rows without a cluster land in `unknown`. Grouping is by cluster id, so
/// names that slug identically share one ranking. Within a group rows are
/// ordered by score then mentions and numbered from 1. Output is ordered by
/// cluster id, then rank.
#[must_use]
pub fn add_cluster_rank(rows: Vec<ScoredRow>) -> Vec<RankedRow> {
    let mut groups: BTreeMap<String, Vec<ScoredRow>> = BTreeMap::new();
    for mut scored in rows {
        let cluster = scored
            .row
            .cluster
            .take()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_CLUSTER.to_string());
        let cluster_id = slugify(&cluster);
        scored.row.cluster = Some(cluster);
        groups.entry(cluster_id).or_default().push(scored);
    }

    let mut ranked = Vec::new();
    for (cluster_id, mut members) in groups {
        members.sort_by(by_score_then_mentions);
        ranked.extend(members.into_iter().enumerate().map(|(idx, scored)| RankedRow {
            scored,
            cluster_id: cluster_id.clone(),
            rank: u32::try_from(idx + 1).unwrap_or(u32::MAX),
        }));
    }
    ranked
}

/// Scores, sorts, and ranks rows in one pass.
#[must_use]
pub fn rank_rows(rows: Vec<ScorableRow>) -> Vec<RankedRow> {
    add_cluster_rank(score_and_sort_rows(rows))
}

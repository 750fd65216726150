//! Dedupe keys for logged decision actions.

use chrono::{DateTime, Datelike, Utc};

/// Builds the dedupe key for a logged decision.
///
/// The key combines the action, the target, the sorted and de-duplicated
/// source list, and the ISO week (Monday start, UTC) containing `as_of`. Two
/// decisions with the same key describe the same logical action within the
/// same week; storage treats the key as unique.
#[must_use]
pub fn build_dedupe_key<S: AsRef<str>>(
    action_type: &str,
    target_type: &str,
    target_id: &str,
    sources: &[S],
    as_of: DateTime<Utc>,
) -> String {
    let mut sources: Vec<String> = sources
        .iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    sources.sort_unstable();
    sources.dedup();

    format!(
        "{}|{}|{}|{}|{}",
        action_type.trim().to_lowercase(),
        target_type.trim().to_lowercase(),
        target_id.trim(),
        sources.join(","),
        iso_week_bucket(as_of)
    )
}

/// ISO week label such as `2026-W43`; the year is the ISO week-numbering year.
#[must_use]
pub fn iso_week_bucket(as_of: DateTime<Utc>) -> String {
    let week = as_of.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::signals::Keyworded;

/// One search result gathered for a research run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub url: String,
    pub domain: String,
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub query: String,
}

/// A candidate term the research run wants evidence counts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchTerm {
    pub keyword: String,
    #[serde(default)]
    pub cluster: Option<String>,
}

/// Output fields added by scoring and ranking. They are dropped from `extra`
/// when a row is scored so re-ranking a ranked row does not repeat them.
pub const DERIVED_ROW_FIELDS: [&str; 3] = ["researchScore", "clusterId", "rank"];

/// A keyword or evidence row awaiting a research score.
///
/// Missing metrics fall back to neutral defaults at scoring time. Fields not
/// modelled here are carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScorableRow {
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentions: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recency_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains_count: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScorableRow {
    #[must_use]
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Self::default()
        }
    }

    /// Removes stale scoring output carried in `extra`.
    pub fn clear_derived_fields(&mut self) {
        for key in DERIVED_ROW_FIELDS {
            self.extra.remove(key);
        }
    }
}

impl Keyworded for ScorableRow {
    fn keyword(&self) -> &str {
        &self.keyword
    }
}

/// A row annotated with its composite research score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRow {
    #[serde(flatten)]
    pub row: ScorableRow,
    pub research_score: f64,
}

impl ScoredRow {
    /// Mention count used for tie-breaks; absent counts as zero.
    #[must_use]
    pub fn mentions(&self) -> i64 {
        self.row.mentions.unwrap_or(0)
    }
}

/// A scored row placed within its cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRow {
    #[serde(flatten)]
    pub scored: ScoredRow,
    pub cluster_id: String,
    /// 1-based position within the cluster.
    pub rank: u32,
}

use serde::{Deserialize, Deserializer, Serialize};

/// Advertiser competition bucket reported for a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompetitionLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl CompetitionLevel {
    /// Parse a free-text competition label.
    ///
    /// Matching is a case-insensitive prefix test on `low`, `med` and `high`
    /// after trimming. Anything else, including the empty string, is
    /// [`CompetitionLevel::Unknown`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if lower.starts_with("low") {
            Self::Low
        } else if lower.starts_with("med") {
            Self::Medium
        } else if lower.starts_with("high") {
            Self::High
        } else {
            Self::Unknown
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for CompetitionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyword/market metric as delivered by the keyword planner import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub keyword: String,
    #[serde(default)]
    pub avg_monthly_searches: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_competition")]
    pub competition_level: Option<CompetitionLevel>,
    #[serde(default)]
    pub cpc_high: Option<f64>,
    /// Fractional change over three months (`0.25` is +25%).
    #[serde(default, rename = "change3mPct")]
    pub change_3m_pct: Option<f64>,
    /// Fractional year-over-year change.
    #[serde(default, rename = "changeYoYPct")]
    pub change_yoy_pct: Option<f64>,
}

impl Signal {
    #[must_use]
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            avg_monthly_searches: None,
            competition_level: None,
            cpc_high: None,
            change_3m_pct: None,
            change_yoy_pct: None,
        }
    }
}

/// Anything that carries a keyword the relevance filter can match against.
pub trait Keyworded {
    fn keyword(&self) -> &str;
}

impl Keyworded for Signal {
    fn keyword(&self) -> &str {
        &self.keyword
    }
}

fn deserialize_competition<'de, D>(deserializer: D) -> Result<Option<CompetitionLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|s| CompetitionLevel::parse(&s)))
}

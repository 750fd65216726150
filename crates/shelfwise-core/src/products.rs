use serde::{Deserialize, Deserializer, Serialize};

/// Seasonal demand profile of a product.
///
/// Free-text values that do not name a known season parse to
/// [`Seasonality::Unknown`], which is treated as seasonal (not `None`) so bad
/// data never makes a product look retire-eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Seasonality {
    #[default]
    None,
    Spring,
    Summer,
    Autumn,
    Winter,
    Holiday,
    Unknown,
}

impl Seasonality {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "" | "none" => Self::None,
            "spring" => Self::Spring,
            "summer" => Self::Summer,
            "autumn" | "fall" => Self::Autumn,
            "winter" => Self::Winter,
            "holiday" | "holidays" | "christmas" => Self::Holiday,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Spring => "SPRING",
            Self::Summer => "SUMMER",
            Self::Autumn => "AUTUMN",
            Self::Winter => "WINTER",
            Self::Holiday => "HOLIDAY",
            Self::Unknown => "UNKNOWN",
        }
    }

    #[must_use]
    pub fn is_seasonal(self) -> bool {
        self != Self::None
    }
}

impl<'de> Deserialize<'de> for Seasonality {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.map_or(Self::None, |s| Self::parse(&s)))
    }
}

impl std::fmt::Display for Seasonality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sales and demand aggregates for one product, the rule engine's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductSignals {
    #[serde(default)]
    pub in_shopify: bool,
    #[serde(default)]
    pub d90_units: u32,
    #[serde(default)]
    pub d180_units: u32,
    #[serde(default)]
    pub requests_30d: u32,
    #[serde(default)]
    pub seasonality: Seasonality,
}

/// Tunable thresholds for the recommendation rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    pub boost_sales_threshold_d90: u32,
    pub retire_sales_threshold_d180: u32,
    pub request_theme_priority_threshold: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            boost_sales_threshold_d90: 10,
            retire_sales_threshold_d180: 2,
            request_theme_priority_threshold: 3,
        }
    }
}

/// What the weekly review should do with a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Migrate,
    Boost,
    Retire,
    Pause,
    Keep,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Migrate => "MIGRATE",
            Self::Boost => "BOOST",
            Self::Retire => "RETIRE",
            Self::Pause => "PAUSE",
            Self::Keep => "KEEP",
        }
    }

    /// Base priority before sales and demand are added.
    #[must_use]
    pub fn base_score(self) -> u64 {
        match self {
            Self::Migrate => 60,
            Self::Boost => 45,
            Self::Retire => 35,
            Self::Keep => 15,
            Self::Pause => 10,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog product with its aggregated signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub product_id: String,
    pub name: String,
    pub signals: ProductSignals,
}

/// One line of the weekly review list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyFocusItem {
    pub product_id: String,
    pub name: String,
    pub action: Action,
    pub priority_score: u64,
    pub why: String,
    pub signals: ProductSignals,
}

//! Weekly product recommendations from sales and demand signals.
//!
//! Rules are evaluated in order and the first match decides the action:
//!
//! | # | Action  | Condition                                                  |
//! |---|---------|------------------------------------------------------------|
//! | 1 | MIGRATE | 90-day units at or above the boost threshold, not on Shopify |
//! | 2 | RETIRE  | 180-day units at or below the retire threshold, not seasonal |
//! | 3 | BOOST   | 90-day units at or above the boost threshold, on Shopify     |
//! | 4 | PAUSE   | seasonal and 90-day units below `max(1, boost / 2)`          |
//! | - | KEEP    | otherwise                                                  |
//!
//! A product that qualifies for both MIGRATE and RETIRE is migrated.

use shelfwise_core::{Action, EngineSettings, ProductInput, ProductSignals, WeeklyFocusItem};

const FALLBACK_WHY: &str = "No strong signals this week; keep the product as is.";
const UNLISTED_BONUS: u64 = 8;

type Predicate = fn(&ProductSignals, &EngineSettings) -> bool;
type Explain = fn(&ProductSignals, &EngineSettings) -> String;

struct Rule {
    action: Action,
    applies: Predicate,
    explain: Explain,
}

const RULES: [Rule; 4] = [
    Rule {
        action: Action::Migrate,
        applies: |s, cfg| s.d90_units >= cfg.boost_sales_threshold_d90 && !s.in_shopify,
        explain: |s, _| {
            format!(
                "Sold {} units in the last 90 days but is not listed on Shopify yet.",
                s.d90_units
            )
        },
    },
    Rule {
        action: Action::Retire,
        applies: |s, cfg| {
            s.d180_units <= cfg.retire_sales_threshold_d180 && !s.seasonality.is_seasonal()
        },
        explain: |s, _| {
            format!(
                "Only {} units sold in the last 180 days and no seasonal demand.",
                s.d180_units
            )
        },
    },
    Rule {
        action: Action::Boost,
        applies: |s, cfg| s.d90_units >= cfg.boost_sales_threshold_d90 && s.in_shopify,
        explain: |s, _| {
            format!(
                "Strong 90-day sales ({} units) on Shopify; worth more visibility.",
                s.d90_units
            )
        },
    },
    Rule {
        action: Action::Pause,
        applies: |s, cfg| s.seasonality.is_seasonal() && s.d90_units < pause_floor(cfg),
        explain: |s, _| {
            format!(
                "Seasonal product ({}) with only {} units in the last 90 days; pause until its season.",
                s.seasonality.as_str().to_lowercase(),
                s.d90_units
            )
        },
    },
];

/// 90-day sales below which a seasonal product is paused.
fn pause_floor(settings: &EngineSettings) -> u32 {
    (settings.boost_sales_threshold_d90 / 2).max(1)
}

/// Outcome of evaluating one product's signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub action: Action,
    pub priority_score: u64,
    pub why: String,
}

/// Sorting weight for the weekly list: the action's base score plus two per
/// 90-day unit, ten per recent request, and eight when not on Shopify.
#[must_use]
pub fn priority_score(action: Action, signals: &ProductSignals) -> u64 {
    let unlisted = if signals.in_shopify { 0 } else { UNLISTED_BONUS };
    action.base_score()
        + u64::from(signals.d90_units) * 2
        + u64::from(signals.requests_30d) * 10
        + unlisted
}

/// Classifies a product's signals. Deterministic for identical inputs.
#[must_use]
pub fn evaluate_signals(signals: &ProductSignals, settings: &EngineSettings) -> Evaluation {
    let mut reasons = Vec::new();

    let action = match RULES.iter().find(|rule| (rule.applies)(signals, settings)) {
        Some(rule) => {
            reasons.push((rule.explain)(signals, settings));
            rule.action
        }
        None => Action::Keep,
    };

    if signals.requests_30d >= settings.request_theme_priority_threshold {
        reasons.push(format!(
            "High customer intent: {} requests in the last 30 days.",
            signals.requests_30d
        ));
    }

    let why = if reasons.is_empty() {
        FALLBACK_WHY.to_string()
    } else {
        reasons.join(" ")
    };

    Evaluation {
        action,
        priority_score: priority_score(action, signals),
        why,
    }
}

/// Evaluates one catalog product into a weekly focus line.
#[must_use]
pub fn evaluate_product(product: &ProductInput, settings: &EngineSettings) -> WeeklyFocusItem {
    let Evaluation {
        action,
        priority_score,
        why,
    } = evaluate_signals(&product.signals, settings);
    WeeklyFocusItem {
        product_id: product.product_id.clone(),
        name: product.name.clone(),
        action,
        priority_score,
        why,
        signals: product.signals,
    }
}

/// Evaluates every product and orders the list by priority, highest first,
/// then by name.
#[must_use]
pub fn build_weekly_focus(
    products: &[ProductInput],
    settings: &EngineSettings,
) -> Vec<WeeklyFocusItem> {
    let mut items: Vec<WeeklyFocusItem> = products
        .iter()
        .map(|p| evaluate_product(p, settings))
        .collect();
    items.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| a.name.cmp(&b.name))
    });
    items
}

/// Signal families behind a recommendation, for dedupe keys and audit logs.
#[must_use]
pub fn decision_sources(item: &WeeklyFocusItem, settings: &EngineSettings) -> Vec<&'static str> {
    let mut sources = vec!["sales"];
    if item.signals.requests_30d >= settings.request_theme_priority_threshold {
        sources.push("requests");
    }
    if item.signals.seasonality.is_seasonal() {
        sources.push("seasonality");
    }
    sources
}

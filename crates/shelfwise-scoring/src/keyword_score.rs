//! Opportunity scoring for keyword signals.

use serde::Serialize;
use shelfwise_core::{CompetitionLevel, Signal};

/// Score and explanation for one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalScore {
    pub score: f64,
    pub reasons: String,
}

/// A signal together with its score, as listed to users.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredSignal {
    #[serde(flatten)]
    pub signal: Signal,
    pub score: f64,
    pub reasons: String,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn competition_penalty(level: Option<CompetitionLevel>) -> f64 {
    match level.unwrap_or(CompetitionLevel::Unknown) {
        CompetitionLevel::Low => 0.0,
        CompetitionLevel::Medium | CompetitionLevel::Unknown => -1.0,
        CompetitionLevel::High => -2.0,
    }
}

fn trend_component(change: Option<f64>) -> f64 {
    match finite(change) {
        Some(c) if c > 0.0 => 0.5,
        Some(c) if c < -0.5 => -0.5,
        _ => 0.0,
    }
}

/// Rounds and clears negative zero so formatting never prints `-0`.
fn round_clean(value: f64) -> f64 {
    value.round() + 0.0
}

fn format_volume(searches: Option<f64>) -> String {
    match searches {
        None => "-".to_string(),
        Some(v) if v >= 1000.0 => format!("{}k", round_clean(v / 1000.0)),
        Some(v) => format!("{}", round_clean(v)),
    }
}

fn format_cpc(cpc: Option<f64>) -> String {
    match finite(cpc) {
        Some(v) => format!("${v:.2}"),
        None => "-".to_string(),
    }
}

fn format_change(change: Option<f64>) -> String {
    match finite(change) {
        None => "-".to_string(),
        Some(c) if c > 0.0 => "+".to_string(),
        Some(c) => format!("{}%", round_clean(c * 100.0)),
    }
}

/// Scores one signal.
///
/// `score = ln(searches + 1) + competition + intent + trend`, where competition
/// is 0/-1/-2 for low/medium/high (unknown counts as medium), intent is 1 when
/// the top-of-page CPC is positive, and each of the 3-month and YoY changes adds
/// +0.5 when growing or -0.5 when down more than 50%. Non-finite inputs count
/// as unknown. The score is unbounded.
///
/// `reasons` lists volume, competition, CPC, 3-month change, and YoY change,
/// pipe separated.
#[must_use]
pub fn score_signal(signal: &Signal) -> SignalScore {
    let searches = finite(signal.avg_monthly_searches).map(|v| v.max(0.0));
    let volume_score = searches.map_or(0.0, f64::ln_1p);
    let intent_score = match finite(signal.cpc_high) {
        Some(cpc) if cpc > 0.0 => 1.0,
        _ => 0.0,
    };
    let trend_score = trend_component(signal.change_3m_pct) + trend_component(signal.change_yoy_pct);

    let score = volume_score
        + competition_penalty(signal.competition_level)
        + intent_score
        + trend_score;

    let competition = signal
        .competition_level
        .unwrap_or(CompetitionLevel::Unknown);
    let reasons = format!(
        "{} | {} | {} | {} | {}",
        format_volume(searches),
        competition,
        format_cpc(signal.cpc_high),
        format_change(signal.change_3m_pct),
        format_change(signal.change_yoy_pct),
    );

    SignalScore { score, reasons }
}

/// Scores every signal and orders them best first; ties fall back to the
/// keyword so output is stable.
#[must_use]
pub fn score_signals(signals: Vec<Signal>) -> Vec<ScoredSignal> {
    let mut scored: Vec<ScoredSignal> = signals
        .into_iter()
        .map(|signal| {
            let SignalScore { score, reasons } = score_signal(&signal);
            ScoredSignal {
                signal,
                score,
                reasons,
            }
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.signal.keyword.cmp(&b.signal.keyword))
    });
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal() -> Signal {
        Signal::new("unicorn pinata")
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn unknown_everything_scores_medium_penalty_only() {
        let result = score_signal(&signal());
        assert!(approx(result.score, -1.0), "got {}", result.score);
        assert_eq!(result.reasons, "- | UNKNOWN | - | - | -");
    }

    #[test]
    fn full_signal_combines_all_components() {
        let s = Signal {
            avg_monthly_searches: Some(999.0),
            competition_level: Some(CompetitionLevel::Low),
            cpc_high: Some(1.2),
            change_3m_pct: Some(0.25),
            change_yoy_pct: Some(-0.6),
            ..signal()
        };
        let result = score_signal(&s);
        let expected = 1000.0_f64.ln() + 0.0 + 1.0 + 0.5 - 0.5;
        assert!(approx(result.score, expected), "got {}", result.score);
        assert_eq!(result.reasons, "999 | LOW | $1.20 | + | -60%");
    }

    #[test]
    fn competition_penalties() {
        for (level, penalty) in [
            (CompetitionLevel::Low, 0.0),
            (CompetitionLevel::Medium, -1.0),
            (CompetitionLevel::High, -2.0),
            (CompetitionLevel::Unknown, -1.0),
        ] {
            let s = Signal {
                competition_level: Some(level),
                ..signal()
            };
            assert!(approx(score_signal(&s).score, penalty), "{level}");
        }
    }

    #[test]
    fn zero_cpc_has_no_intent() {
        let s = Signal {
            cpc_high: Some(0.0),
            competition_level: Some(CompetitionLevel::Low),
            ..signal()
        };
        assert!(approx(score_signal(&s).score, 0.0));
        assert_eq!(score_signal(&s).reasons, "- | LOW | $0.00 | - | -");
    }

    #[test]
    fn small_declines_are_neutral() {
        let s = Signal {
            competition_level: Some(CompetitionLevel::Low),
            change_3m_pct: Some(-0.5),
            change_yoy_pct: Some(0.0),
            ..signal()
        };
        let result = score_signal(&s);
        assert!(approx(result.score, 0.0));
        assert_eq!(result.reasons, "- | LOW | - | -50% | 0%");
    }

    #[test]
    fn trend_is_bounded() {
        let up = Signal {
            competition_level: Some(CompetitionLevel::Low),
            change_3m_pct: Some(5.0),
            change_yoy_pct: Some(9.0),
            ..signal()
        };
        let down = Signal {
            change_3m_pct: Some(-0.9),
            change_yoy_pct: Some(-0.99),
            ..up.clone()
        };
        assert!(approx(score_signal(&up).score, 1.0));
        assert!(approx(score_signal(&down).score, -1.0));
    }

    #[test]
    fn reasons_are_five_bare_fields() {
        let s = Signal {
            avg_monthly_searches: Some(12_400.0),
            competition_level: Some(CompetitionLevel::High),
            cpc_high: Some(1.5),
            change_3m_pct: Some(0.2),
            change_yoy_pct: Some(-0.3),
            ..signal()
        };
        assert_eq!(score_signal(&s).reasons, "12k | HIGH | $1.50 | + | -30%");
    }

    #[test]
    fn volume_formats_thousands_with_k() {
        let s = Signal {
            avg_monthly_searches: Some(12_400.0),
            ..signal()
        };
        assert!(score_signal(&s).reasons.starts_with("12k |"));
        let s = Signal {
            avg_monthly_searches: Some(1_500.0),
            ..signal()
        };
        assert!(score_signal(&s).reasons.starts_with("2k |"));
        let s = Signal {
            avg_monthly_searches: Some(45.4),
            ..signal()
        };
        assert!(score_signal(&s).reasons.starts_with("45 |"));
    }

    #[test]
    fn non_finite_inputs_are_unknown() {
        let s = Signal {
            avg_monthly_searches: Some(f64::NAN),
            cpc_high: Some(f64::INFINITY),
            change_3m_pct: Some(f64::NEG_INFINITY),
            change_yoy_pct: Some(f64::NAN),
            ..signal()
        };
        let result = score_signal(&s);
        assert!(result.score.is_finite());
        assert!(approx(result.score, -1.0));
        assert_eq!(result.reasons, "- | UNKNOWN | - | - | -");
    }

    #[test]
    fn negative_searches_clamp_to_zero() {
        let s = Signal {
            avg_monthly_searches: Some(-50.0),
            competition_level: Some(CompetitionLevel::Low),
            ..signal()
        };
        let result = score_signal(&s);
        assert!(approx(result.score, 0.0));
        assert!(result.reasons.starts_with("0 |"));
    }

    #[test]
    fn tiny_negative_change_prints_zero_not_negative_zero() {
        let s = Signal {
            change_yoy_pct: Some(-0.001),
            ..signal()
        };
        assert_eq!(score_signal(&s).reasons, "- | UNKNOWN | - | - | 0%");
    }

    #[test]
    fn score_signals_sorts_descending_with_keyword_tiebreak() {
        let high = Signal {
            avg_monthly_searches: Some(5000.0),
            competition_level: Some(CompetitionLevel::Low),
            ..Signal::new("b high")
        };
        let tie_a = Signal::new("a tie");
        let tie_c = Signal::new("c tie");
        let ordered = score_signals(vec![tie_c, high, tie_a]);
        let keywords: Vec<&str> = ordered.iter().map(|s| s.signal.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["b high", "a tie", "c tie"]);
    }
}

//! Scoring, filtering, and ranking for shelfwise.
//!
//! Everything here is pure and synchronous: keyword relevance filtering,
//! keyword opportunity scores, research scores with per-cluster ranking, and
//! the weekly recommendation rules.

pub mod evidence;
pub mod keyword_score;
pub mod relevance;
pub mod research;
pub mod rule_engine;
pub mod terms;

pub use evidence::{cached_search, recency_score, rows_from_evidence};
pub use keyword_score::{score_signal, score_signals, ScoredSignal, SignalScore};
pub use relevance::{
    context_for_mode, filter_signals, product_type_match, FilterMode, RelevanceOutcome,
};
pub use research::{
    add_cluster_rank, compute_research_score, rank_rows, score_and_sort_rows, slugify,
};
pub use rule_engine::{
    build_weekly_focus, decision_sources, evaluate_product, evaluate_signals, priority_score,
    Evaluation,
};
pub use terms::{normalize, phrase_match};

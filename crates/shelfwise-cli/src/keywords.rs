//! Keyword relevance filtering and opportunity scoring.

use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;
use shelfwise_core::{RelevanceVocabulary, Signal};
use shelfwise_scoring::{context_for_mode, filter_signals, score_signals, FilterMode, ScoredSignal};

/// Sub-commands available under `keywords`.
#[derive(Debug, Subcommand)]
pub enum KeywordCommands {
    /// Filter keyword signals by relevance and print them scored
    Score {
        /// JSON file holding an array of keyword signals
        #[arg(long)]
        input: PathBuf,
        /// Filter mode: strict, broad, or all
        #[arg(long, default_value = "strict")]
        mode: String,
        /// Relevance vocabulary YAML (defaults to SHELFWISE_RELEVANCE_PATH)
        #[arg(long, conflicts_with = "from_db")]
        vocabulary: Option<PathBuf>,
        /// Load the relevance vocabulary from the database instead of YAML
        #[arg(long)]
        from_db: bool,
        /// Only print the top N scored keywords
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KeywordReport {
    mode: &'static str,
    filtered_out_count: usize,
    matched_product_type_keys: Vec<String>,
    matched_occasion_terms: Vec<String>,
    matched_exclude_terms: Vec<String>,
    keywords: Vec<ScoredSignal>,
}

pub(crate) async fn run(
    config: &shelfwise_core::AppConfig,
    command: KeywordCommands,
) -> anyhow::Result<()> {
    match command {
        KeywordCommands::Score {
            input,
            mode,
            vocabulary,
            from_db,
            limit,
        } => {
            let vocabulary = if from_db {
                let pool = crate::connect(config).await?;
                shelfwise_db::load_relevance_vocabulary(&pool).await?
            } else {
                let path = crate::path_or(vocabulary, &config.relevance_path);
                shelfwise_core::load_relevance_vocabulary(&path)?
            };
            let signals: Vec<Signal> = crate::read_json(&input)?;
            let report = score_keywords(signals, &vocabulary, FilterMode::parse(&mode), limit);
            crate::print_json(&report)
        }
    }
}

fn score_keywords(
    signals: Vec<Signal>,
    vocabulary: &RelevanceVocabulary,
    mode: FilterMode,
    limit: Option<usize>,
) -> KeywordReport {
    let context = context_for_mode(vocabulary, mode);
    let outcome = filter_signals(signals, &context, mode);
    tracing::info!(
        mode = mode.as_str(),
        kept = outcome.filtered_signals.len(),
        dropped = outcome.filtered_out_count,
        "keywords filtered"
    );

    let mut keywords = score_signals(outcome.filtered_signals);
    if let Some(limit) = limit {
        keywords.truncate(limit);
    }

    KeywordReport {
        mode: mode.as_str(),
        filtered_out_count: outcome.filtered_out_count,
        matched_product_type_keys: outcome.matched_product_type_keys.into_iter().collect(),
        matched_occasion_terms: outcome.matched_occasion_terms.into_iter().collect(),
        matched_exclude_terms: outcome.matched_exclude_terms.into_iter().collect(),
        keywords,
    }
}

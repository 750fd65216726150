//! Research ranking wrapped in a tracked run.
//!
//! `research rank` creates a run already in `running`, gathers evidence per
//! term through the search cache, aggregates and ranks, then finalizes the
//! run. The cancel flag is checked between steps; a cancelled run is
//! finalized as failed. With `--dry-run` the run lives in an in-process store
//! and nothing touches the database.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use clap::Subcommand;
use serde_json::{json, Value};
use shelfwise_core::{
    Evidence, MemoryRunStore, RankedRow, ResearchTerm, RunRecord, RunStatus, TtlCache,
};
use shelfwise_scoring::{cached_search, normalize, rank_rows, rows_from_evidence};

const RUN_KIND: &str = "research";

/// Sub-commands available under `research`.
#[derive(Debug, Subcommand)]
pub enum ResearchCommands {
    /// Rank research terms by the evidence that mentions them
    Rank {
        /// JSON file holding an array of research terms (`keyword`, `cluster`)
        #[arg(long)]
        terms: PathBuf,
        /// JSON file holding gathered evidence items
        #[arg(long)]
        evidence: PathBuf,
        /// Track the run in memory instead of the database
        #[arg(long)]
        dry_run: bool,
    },
}

/// Where run state lives for one invocation.
pub(crate) enum RunTracker {
    Db(sqlx::PgPool),
    Memory(MemoryRunStore),
}

impl RunTracker {
    async fn start(&self, kind: &str) -> anyhow::Result<RunRecord> {
        match self {
            Self::Db(pool) => Ok(shelfwise_db::create_run(pool, kind, RunStatus::Running).await?),
            Self::Memory(store) => Ok(store.create_running(kind)),
        }
    }

    async fn is_cancel_requested(&self, id: i64) -> anyhow::Result<bool> {
        match self {
            Self::Db(pool) => Ok(shelfwise_db::is_run_cancel_requested(pool, id).await?),
            Self::Memory(store) => Ok(store.is_cancel_requested(id)),
        }
    }

    async fn finalize_success(
        &self,
        id: i64,
        result: Value,
        timings_ms: Value,
    ) -> anyhow::Result<bool> {
        match self {
            Self::Db(pool) => {
                Ok(shelfwise_db::finalize_run_success(pool, id, &result, Some(&timings_ms)).await?)
            }
            Self::Memory(store) => Ok(store.finalize_success(id, result, Some(timings_ms))),
        }
    }

    async fn finalize_failed(
        &self,
        id: i64,
        error: Value,
        timings_ms: Value,
    ) -> anyhow::Result<bool> {
        match self {
            Self::Db(pool) => {
                Ok(shelfwise_db::finalize_run_failed(pool, id, &error, Some(&timings_ms)).await?)
            }
            Self::Memory(store) => Ok(store.finalize_failed(id, error, Some(timings_ms))),
        }
    }

    /// Finalize as failed; storage errors are logged, not returned.
    async fn fail_best_effort(&self, id: i64, error: Value, timings_ms: Value) {
        match self.finalize_failed(id, error, timings_ms).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(run_id = id, "run was already finalized"),
            Err(e) => tracing::error!(run_id = id, error = %e, "failed to mark run as failed"),
        }
    }
}

/// Elapsed milliseconds per step, recorded into `timings_ms`.
#[derive(Debug, Default)]
struct StepTimings(serde_json::Map<String, Value>);

impl StepTimings {
    fn record(&mut self, step: &str, started: Instant) {
        let ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.0.insert(step.to_string(), Value::from(ms));
    }

    fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

enum RankOutcome {
    Ranked(Vec<RankedRow>),
    Cancelled,
}

pub(crate) async fn run(
    config: &shelfwise_core::AppConfig,
    command: ResearchCommands,
) -> anyhow::Result<()> {
    match command {
        ResearchCommands::Rank {
            terms,
            evidence,
            dry_run,
        } => {
            let terms: Vec<ResearchTerm> = crate::read_json(&terms)?;
            let corpus: Vec<Evidence> = crate::read_json(&evidence)?;
            let tracker = if dry_run {
                RunTracker::Memory(MemoryRunStore::new())
            } else {
                RunTracker::Db(crate::connect(config).await?)
            };
            let cache = TtlCache::new();
            let rows = run_research_rank(&tracker, config, &cache, &terms, &corpus).await?;
            crate::print_json(&rows)
        }
    }
}

/// Runs the full research pipeline under a tracked run and returns the
/// ranked rows.
///
/// # Errors
///
/// Returns an error if the run cannot be created, a step fails, or the run is
/// cancelled before it completes.
pub(crate) async fn run_research_rank(
    tracker: &RunTracker,
    config: &shelfwise_core::AppConfig,
    cache: &TtlCache<Vec<Evidence>>,
    terms: &[ResearchTerm],
    corpus: &[Evidence],
) -> anyhow::Result<Vec<RankedRow>> {
    let run = tracker.start(RUN_KIND).await?;
    let run_started = Instant::now();
    let mut timings = StepTimings::default();
    tracing::info!(run_id = run.id, terms = terms.len(), "research run started");

    let outcome = rank_steps(tracker, config, cache, run.id, terms, corpus, &mut timings).await;
    timings.record("total", run_started);

    match outcome {
        Ok(RankOutcome::Ranked(rows)) => {
            let result = json!({ "rowCount": rows.len(), "rows": rows });
            let applied = tracker
                .finalize_success(run.id, result, timings.to_value())
                .await?;
            if !applied {
                tracing::warn!(run_id = run.id, "research run finalized elsewhere");
            }
            tracing::info!(run_id = run.id, rows = rows.len(), "research run succeeded");
            Ok(rows)
        }
        Ok(RankOutcome::Cancelled) => {
            tracker
                .fail_best_effort(run.id, json!({ "message": "cancelled" }), timings.to_value())
                .await;
            tracing::info!(run_id = run.id, "research run cancelled");
            anyhow::bail!("research run {} was cancelled", run.id)
        }
        Err(err) => {
            let error = json!({ "message": format!("{err:#}") });
            tracker
                .fail_best_effort(run.id, error, timings.to_value())
                .await;
            Err(err)
        }
    }
}

async fn rank_steps(
    tracker: &RunTracker,
    config: &shelfwise_core::AppConfig,
    cache: &TtlCache<Vec<Evidence>>,
    run_id: i64,
    terms: &[ResearchTerm],
    corpus: &[Evidence],
    timings: &mut StepTimings,
) -> anyhow::Result<RankOutcome> {
    let step = Instant::now();
    let ttl = Duration::from_secs(config.search_cache_ttl_secs);
    let mut gathered: Vec<Evidence> = Vec::new();
    let mut seen_urls: BTreeSet<String> = BTreeSet::new();
    for term in terms {
        let hits = cached_search(cache, &term.keyword, ttl, |query| {
            Ok::<_, anyhow::Error>(search_corpus(corpus, query))
        })
        .with_context(|| format!("search failed for '{}'", term.keyword))?;
        for item in hits {
            if seen_urls.insert(item.url.clone()) {
                gathered.push(item);
            }
        }
    }
    timings.record("gather", step);

    if tracker.is_cancel_requested(run_id).await? {
        return Ok(RankOutcome::Cancelled);
    }

    let step = Instant::now();
    let rows = rows_from_evidence(terms, &gathered, Utc::now(), config.recency_half_life_days);
    timings.record("aggregate", step);

    if tracker.is_cancel_requested(run_id).await? {
        return Ok(RankOutcome::Cancelled);
    }

    let step = Instant::now();
    let ranked = rank_rows(rows);
    timings.record("rank", step);

    Ok(RankOutcome::Ranked(ranked))
}

/// Evidence gathered for `query`, matched on the normalized query text.
fn search_corpus(corpus: &[Evidence], query: &str) -> Vec<Evidence> {
    let wanted = normalize(query);
    corpus
        .iter()
        .filter(|item| normalize(&item.query) == wanted)
        .cloned()
        .collect()
}

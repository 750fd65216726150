//! Weekly focus list: evaluate every product, store the list, and log the
//! non-trivial recommendations as deduplicated decisions.

use std::path::PathBuf;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use clap::Subcommand;
use serde_json::json;
use shelfwise_core::{Action, EngineSettings, ProductInput, WeeklyFocusItem};
use shelfwise_scoring::{build_weekly_focus, decision_sources};

/// Sub-commands available under `focus`.
#[derive(Debug, Subcommand)]
pub enum FocusCommands {
    /// Evaluate products and build this week's focus list
    Build {
        /// JSON file of products with signals (defaults to loading from the database)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Evaluate as of this date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Print the list without storing it or logging decisions
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the stored focus list for a week
    Show {
        /// Any date within the week (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        week: Option<NaiveDate>,
    },
}

pub(crate) async fn run(
    config: &shelfwise_core::AppConfig,
    command: FocusCommands,
) -> anyhow::Result<()> {
    match command {
        FocusCommands::Build {
            input,
            as_of,
            dry_run,
        } => run_focus_build(config, input, as_of, dry_run).await,
        FocusCommands::Show { week } => {
            let pool = crate::connect(config).await?;
            let week_start = week_start(week.unwrap_or_else(|| Utc::now().date_naive()));
            let rows = shelfwise_db::list_weekly_focus(&pool, week_start).await?;
            if rows.is_empty() {
                println!("no focus list stored for week of {week_start}; run `focus build` first");
                return Ok(());
            }
            println!("{:<8}{:<10}{:<24}WHY", "SCORE", "ACTION", "PRODUCT");
            for row in &rows {
                println!(
                    "{:<8}{:<10}{:<24}{}",
                    row.priority_score,
                    row.action,
                    truncate(&row.name, 22),
                    row.why
                );
            }
            Ok(())
        }
    }
}

async fn run_focus_build(
    config: &shelfwise_core::AppConfig,
    input: Option<PathBuf>,
    as_of: Option<NaiveDate>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let as_of = as_of.map_or_else(Utc::now, start_of_day);

    let pool = if input.is_none() || !dry_run {
        Some(crate::connect(config).await?)
    } else {
        None
    };

    let products: Vec<ProductInput> = match (&input, &pool) {
        (Some(path), _) => crate::read_json(path)?,
        (None, Some(pool)) => shelfwise_db::load_product_inputs(pool, as_of).await?,
        (None, None) => anyhow::bail!("no product input given and no database connection"),
    };

    let settings = match &pool {
        Some(pool) => shelfwise_db::load_engine_settings(pool)
            .await?
            .unwrap_or_else(|| config.default_engine_settings()),
        None => config.default_engine_settings(),
    };

    let items = build_weekly_focus(&products, &settings);
    print_focus(&items);

    let Some(pool) = pool.filter(|_| !dry_run) else {
        println!("dry-run: {} items not stored", items.len());
        return Ok(());
    };

    let week = week_start(as_of.date_naive());
    shelfwise_db::replace_weekly_focus(&pool, week, &items).await?;

    let mut logged = 0_usize;
    let mut skipped = 0_usize;
    for item in items.iter().filter(|i| i.action != Action::Keep) {
        let decision = decision_for(item, &settings, as_of);
        if shelfwise_db::log_decision_action(&pool, &decision).await? {
            logged += 1;
        } else {
            skipped += 1;
        }
    }

    tracing::info!(%week, items = items.len(), logged, skipped, "weekly focus built");
    println!(
        "stored {} items for week of {week}; logged {logged} decisions ({skipped} already logged)",
        items.len()
    );
    Ok(())
}

fn decision_for(
    item: &WeeklyFocusItem,
    settings: &EngineSettings,
    as_of: DateTime<Utc>,
) -> shelfwise_db::NewDecisionAction {
    shelfwise_db::NewDecisionAction {
        action_type: item.action.as_str().to_string(),
        target_type: "product".to_string(),
        target_id: item.product_id.clone(),
        sources: decision_sources(item, settings)
            .into_iter()
            .map(str::to_string)
            .collect(),
        payload: json!({
            "name": item.name,
            "priorityScore": item.priority_score,
            "why": item.why,
            "signals": item.signals,
        }),
        as_of,
    }
}

fn print_focus(items: &[WeeklyFocusItem]) {
    if items.is_empty() {
        println!("no active products to evaluate");
        return;
    }
    println!("{:<8}{:<10}{:<24}WHY", "SCORE", "ACTION", "PRODUCT");
    for item in items {
        println!(
            "{:<8}{:<10}{:<24}{}",
            item.priority_score,
            item.action.as_str(),
            truncate(&item.name, 22),
            item.why
        );
    }
}

/// Monday of the ISO week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars - 3).collect::<String>())
    } else {
        text.to_string()
    }
}

//! Run inspection and cancellation.

use clap::Subcommand;
use shelfwise_core::RunRecord;

/// Sub-commands available under `runs`.
#[derive(Debug, Subcommand)]
pub enum RunsCommands {
    /// List recent runs
    List {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Show one run with its result or error
    Show {
        /// Run id
        id: i64,
    },
    /// Request cancellation of a run
    Cancel {
        /// Run id
        id: i64,
    },
}

pub(crate) async fn run(pool: &sqlx::PgPool, command: RunsCommands) -> anyhow::Result<()> {
    match command {
        RunsCommands::List { limit } => {
            let runs = shelfwise_db::list_runs(pool, limit).await?;
            if runs.is_empty() {
                println!("no runs recorded yet");
                return Ok(());
            }
            println!("{:<8}{:<12}{:<10}{:<22}CANCEL", "ID", "KIND", "STATUS", "CREATED");
            for run in &runs {
                println!("{}", format_run_line(run));
            }
            Ok(())
        }
        RunsCommands::Show { id } => {
            let run = shelfwise_db::get_run(pool, id).await?;
            crate::print_json(&run)
        }
        RunsCommands::Cancel { id } => {
            if !shelfwise_db::request_run_cancel(pool, id).await? {
                anyhow::bail!("run {id} not found");
            }
            tracing::info!(run_id = id, "cancel requested");
            println!("cancel requested for run {id}");
            Ok(())
        }
    }
}

fn format_run_line(run: &RunRecord) -> String {
    format!(
        "{:<8}{:<12}{:<10}{:<22}{}",
        run.id,
        run.kind,
        run.status.as_str(),
        run.created_at.format("%Y-%m-%d %H:%M:%S"),
        if run.cancel_requested() { "yes" } else { "" }
    )
}

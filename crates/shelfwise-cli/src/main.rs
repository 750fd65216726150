mod focus;
mod keywords;
mod research;
mod runs;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use crate::focus::FocusCommands;
use crate::keywords::KeywordCommands;
use crate::research::ResearchCommands;
use crate::runs::RunsCommands;

#[derive(Debug, Parser)]
#[command(name = "shelfwise")]
#[command(about = "Keyword relevance, research ranking, and weekly product focus")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Filter and score keyword signals
    Keywords {
        #[command(subcommand)]
        command: KeywordCommands,
    },
    /// Score and rank research terms from gathered evidence
    Research {
        #[command(subcommand)]
        command: ResearchCommands,
    },
    /// Build the weekly product focus list
    Focus {
        #[command(subcommand)]
        command: FocusCommands,
    },
    /// Inspect and cancel runs
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = shelfwise_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Db { command }) => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    shelfwise_db::ping(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = shelfwise_db::run_migrations(&pool).await?;
                    println!("applied {applied} migrations");
                }
            }
        }
        Some(Commands::Keywords { command }) => keywords::run(&config, command).await?,
        Some(Commands::Research { command }) => research::run(&config, command).await?,
        Some(Commands::Focus { command }) => focus::run(&config, command).await?,
        Some(Commands::Runs { command }) => {
            let pool = connect(&config).await?;
            runs::run(&pool, command).await?;
        }
        None => println!("shelfwise: no command given; see --help"),
    }

    Ok(())
}

/// Connect to Postgres using the configured URL and pool settings.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is unset or the connection fails.
pub(crate) async fn connect(config: &shelfwise_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    config.require_database_url()?;
    let pool = shelfwise_db::connect_pool_from_config(config)
        .await
        .context("failed to connect to database")?;
    Ok(pool)
}

/// Read and deserialize a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Pretty-print a value as JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Path given on the command line, or the configured default.
pub(crate) fn path_or(explicit: Option<PathBuf>, default: &Path) -> PathBuf {
    explicit.unwrap_or_else(|| default.to_path_buf())
}

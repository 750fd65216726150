//! Shared domain types, configuration, and run lifecycle for shelfwise.

pub mod app_config;
pub mod cache;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod products;
pub mod relevance;
pub mod research;
pub mod runs;
pub mod signals;

pub use app_config::{AppConfig, Environment};
pub use cache::TtlCache;
pub use config::{load_app_config, load_app_config_from_env};
pub use dedupe::{build_dedupe_key, iso_week_bucket};
pub use error::ConfigError;
pub use products::{
    Action, EngineSettings, ProductInput, ProductSignals, Seasonality, WeeklyFocusItem,
};
pub use relevance::{
    load_relevance_vocabulary, parse_relevance_vocabulary, ProductTypeEntry, ProductTypeMatch,
    RelevanceContext, RelevanceVocabulary,
};
pub use research::{
    Evidence, RankedRow, ResearchTerm, ScorableRow, ScoredRow, DERIVED_ROW_FIELDS,
};
pub use runs::{MemoryRunStore, RunRecord, RunStatus, CANCEL_REQUESTED_KEY};
pub use signals::{CompetitionLevel, Keyworded, Signal};

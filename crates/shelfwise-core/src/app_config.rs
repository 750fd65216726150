use std::path::PathBuf;

use crate::{ConfigError, EngineSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Only DB-backed commands need this; offline scoring runs without it.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub relevance_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub boost_sales_threshold_d90: u32,
    pub retire_sales_threshold_d180: u32,
    pub request_theme_priority_threshold: u32,
    pub search_cache_ttl_secs: u64,
    pub recency_half_life_days: f64,
}

impl AppConfig {
    /// Returns the configured database URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DATABASE_URL` was not set.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }

    /// Engine thresholds from the environment, used when the settings table
    /// has no row yet.
    #[must_use]
    pub fn default_engine_settings(&self) -> EngineSettings {
        EngineSettings {
            boost_sales_threshold_d90: self.boost_sales_threshold_d90,
            retire_sales_threshold_d180: self.retire_sales_threshold_d180,
            request_theme_priority_threshold: self.request_theme_priority_threshold,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("relevance_path", &self.relevance_path)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("boost_sales_threshold_d90", &self.boost_sales_threshold_d90)
            .field(
                "retire_sales_threshold_d180",
                &self.retire_sales_threshold_d180,
            )
            .field(
                "request_theme_priority_threshold",
                &self.request_theme_priority_threshold,
            )
            .field("search_cache_ttl_secs", &self.search_cache_ttl_secs)
            .field("recency_half_life_days", &self.recency_half_life_days)
            .finish()
    }
}

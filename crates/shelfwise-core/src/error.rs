use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read relevance file {path}: {source}")]
    RelevanceFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse relevance file: {0}")]
    RelevanceFileParse(#[from] serde_yaml::Error),

    #[error("relevance validation failed: {0}")]
    Validation(String),
}

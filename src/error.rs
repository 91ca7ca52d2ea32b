use std::path::PathBuf;
use thiserror::Error;

// Failures talking to a task source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("task {0} not found")]
    NotFound(String),
    #[error("could not decode task data: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0} must be set for the remote source")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("could not prepare log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not install logger: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}

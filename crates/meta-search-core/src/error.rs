use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Could not decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Cannot access scan root {path}: {source}")]
    RootAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No search criteria configured: provide a search expression or a custom filter")]
    EmptyCriteria,

    #[error("Scan cancelled")]
    Cancelled,

    #[error("A scan is already running on this engine")]
    ScanInProgress,

    #[error("{0}")]
    Other(String),
}

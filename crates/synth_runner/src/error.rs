use std::path::PathBuf;

use thiserror::Error;

use synth_core::ConfigError;

/// Failure to turn a topology file into core configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid topology JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid weather CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid timestamp `{value}`: {message}")]
    Timestamp { value: String, message: String },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Failure to write generated data.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    Empty,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Topology(#[from] ConfigLoadError),
}

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the export pipeline.
///
/// Input and configuration problems abort the run before any output is
/// written; there is no partial output and no retry.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("failed to open input file {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("required column `{0}` missing from input")]
    MissingColumn(&'static str),
    #[error("Parquet read error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

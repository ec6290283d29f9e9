//! Error types for the pipeline stages.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by the loader, splitter, scaler, trainer and reporter.
///
/// Every message names the stage that failed and the input it failed on.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input file is missing or unreadable
    #[error("load: cannot read {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The input file is not valid delimited text
    #[error("load: {} is not valid CSV: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The requested target column does not exist
    #[error("split: target column {column:?} not found (available: {})", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// Not enough rows for the requested operation
    #[error("{stage}: {message}")]
    InsufficientData {
        stage: &'static str,
        message: String,
    },

    /// A setting is outside its valid range
    #[error("{stage}: invalid configuration: {message}")]
    InvalidConfig {
        stage: &'static str,
        message: String,
    },

    /// A NaN or infinite value reached the scaler
    #[error("scale: non-finite value {value} in column {column} at row {row}")]
    NonFinite { column: usize, row: usize, value: f64 },

    /// Matrix or vector dimensions disagree
    #[error("{stage}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl PipelineError {
    pub(crate) fn insufficient(stage: &'static str, message: impl Into<String>) -> Self {
        Self::InsufficientData {
            stage,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(stage: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            stage,
            message: message.into(),
        }
    }

    pub(crate) fn shape(stage: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            stage,
            expected,
            actual,
        }
    }
}

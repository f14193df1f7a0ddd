//! Error types for the wavebook library.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for wavebook operations.
#[derive(Debug, Error)]
pub enum WavebookError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A template, rule, or batch setting is invalid.
    #[error("Configuration error in '{rule}': {message}")]
    Config { rule: String, message: String },

    /// Discovery matched no files.
    #[error("No data sources under '{root}' match pattern '{pattern}'")]
    EmptyDiscovery { root: PathBuf, pattern: String },

    /// A rule or derived variable references a column the dataset lacks.
    #[error("Column '{column}' not found ({context})")]
    MissingColumn { column: String, context: String },

    /// The file could not be parsed as tabular survey data.
    #[error("Unreadable source '{path}': {message}")]
    UnreadableSource { path: PathBuf, message: String },

    /// Required columns are absent from the source.
    #[error("Schema mismatch in '{path}': missing column(s) {missing:?}")]
    SchemaMismatch { path: PathBuf, missing: Vec<String> },

    /// The configured weight column is absent.
    #[error("Weight column '{column}' not found in '{path}'")]
    MissingWeightColumn { path: PathBuf, column: String },

    /// A weight value is missing, negative, or not finite.
    #[error("Invalid weight '{value}' in column '{column}' at row {row}")]
    InvalidWeight {
        column: String,
        row: usize,
        value: String,
    },

    /// A categorical column ended up with no labels.
    #[error("Categorical column '{column}' has an empty label set")]
    EmptyLabelSet { column: String },

    /// A tabulation could not be evaluated.
    #[error("Aggregation error for {spec}: {message}")]
    Aggregation { spec: String, message: String },

    /// The rendering backend reported a failure.
    #[error("Render backend '{backend}' failed: {diagnostic}")]
    RenderBackend { backend: String, diagnostic: String },

    /// Error persisting batch artefacts.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Coarse error classification recorded in per-source batch results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad rule, template, or batch setting.
    Configuration,
    /// Source data does not match what the template expects.
    DataQuality,
    /// A tabulation referenced something it could not evaluate.
    Aggregation,
    /// The external renderer failed.
    RenderBackend,
    /// Filesystem or serialization failure.
    Io,
}

impl ErrorKind {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::DataQuality => "data quality",
            ErrorKind::Aggregation => "aggregation",
            ErrorKind::RenderBackend => "render backend",
            ErrorKind::Io => "io",
        }
    }
}

impl WavebookError {
    /// Shorthand for a configuration error.
    pub fn config(rule: impl Into<String>, message: impl Into<String>) -> Self {
        WavebookError::Config {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WavebookError::Config { .. }
            | WavebookError::EmptyDiscovery { .. }
            | WavebookError::MissingColumn { .. }
            | WavebookError::Regex(_) => ErrorKind::Configuration,
            WavebookError::UnreadableSource { .. }
            | WavebookError::SchemaMismatch { .. }
            | WavebookError::MissingWeightColumn { .. }
            | WavebookError::InvalidWeight { .. }
            | WavebookError::EmptyLabelSet { .. }
            | WavebookError::Csv(_) => ErrorKind::DataQuality,
            WavebookError::Aggregation { .. } => ErrorKind::Aggregation,
            WavebookError::RenderBackend { .. } => ErrorKind::RenderBackend,
            WavebookError::Io { .. } | WavebookError::Json(_) | WavebookError::Persistence(_) => {
                ErrorKind::Io
            }
        }
    }
}

/// Result type alias for wavebook operations.
pub type Result<T> = std::result::Result<T, WavebookError>;

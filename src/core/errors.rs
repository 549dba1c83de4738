// src/core/errors.rs
use thiserror::Error;

/// Errors surfaced by the rule engines.
///
/// Per-cell arithmetic trouble (an unparseable value, a constant column) is
/// never reported here: those cells fall back to 0.0 and training carries on.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Missing Column: '{0}' is not present in the dataset")]
    MissingColumn(String),

    #[error("Incompatible Dimensions: {0}")]
    IncompatibleDimensions(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ndarray Error: {0}")]
    Ndarray(#[from] ndarray::ShapeError),
}

impl InsightError {
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        InsightError::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, InsightError>;

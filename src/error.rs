//! Error types for the maiware classification pipeline.
//!
//! Every fallible operation in the crate returns [`Result`]. Whether an error
//! aborts an analysis or only disables one subsystem is decided by the
//! pipeline, not here.

use thiserror::Error;

use crate::formats::pe::PeError;

/// Main error type for maiware operations.
#[derive(Debug, Error)]
pub enum MaiwareError {
    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structural PE parsing errors
    #[error("PE parse error: {0}")]
    Pe(#[from] PeError),

    /// Feature extraction produced nothing usable
    #[error("Feature extraction failed: {0}")]
    FeatureExtraction(String),

    /// Model column schema could not be loaded or is inconsistent
    #[error("Schema error: {0}")]
    Schema(String),

    /// A single ensemble member failed to load or predict
    #[error("Model '{model}' failed: {message}")]
    Model { model: String, message: String },

    /// Aggregating the per-model predictions failed
    #[error("Voting error: {0}")]
    Voting(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation exceeded its time bound
    #[error("Operation timed out after {}ms", .limit.as_millis())]
    Timeout { limit: std::time::Duration },

    /// External tool could not be run
    #[error("External tool error: {0}")]
    Tool(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for maiware operations
pub type Result<T> = std::result::Result<T, MaiwareError>;

impl MaiwareError {
    /// Convenience constructor for per-model failures.
    pub fn model(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            model: model.into(),
            message: message.into(),
        }
    }
}

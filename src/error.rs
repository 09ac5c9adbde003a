//! Error types for dimorph.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during training, evaluation, or persistence.
#[derive(Error, Debug)]
pub enum DimorphError {
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Tensor or array shape mismatch.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        got: Vec<usize>,
    },

    /// A data loader produced zero samples.
    #[error("empty loader: no samples to aggregate")]
    EmptyLoader,

    /// A loss value became NaN or infinite.
    #[error("non-finite loss encountered: {value}")]
    NonFiniteLoss {
        /// The offending value.
        value: f64,
    },

    /// Normalization statistics file is missing.
    #[error("normalization statistics not found at {path:?}")]
    MissingStats {
        /// Path that was probed.
        path: PathBuf,
    },

    /// Invalid or corrupted data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Model or optimizer record error.
    #[error("record error: {0}")]
    Record(#[from] burn::record::RecorderError),
}

impl DimorphError {
    /// Whether this error only blocks persisting a fold's result.
    ///
    /// Persistence failures are reported per fold and must not abort the
    /// remaining folds; everything else is fatal.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            DimorphError::Io(_) | DimorphError::Serde(_) | DimorphError::Record(_)
        )
    }
}

/// Result type for dimorph operations.
pub type Result<T> = std::result::Result<T, DimorphError>;

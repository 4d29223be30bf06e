//! Error types for the Lumina analytics pipeline

use thiserror::Error;

/// Result type alias for Lumina operations
pub type Result<T> = std::result::Result<T, LuminaError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum LuminaError {
    #[error("Unreadable file: {0}")]
    UnreadableFile(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("No numeric column available to use as a target")]
    NoTargetFound,

    #[error("Target column not found: {0}")]
    TargetNotFound(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("No feature columns remain after removing target '{target}'")]
    AllFeaturesDegenerate { target: String },

    #[error("No trained model available. Analyze a dataset first.")]
    NoModelAvailable,

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("No records provided for prediction")]
    EmptyInput,

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LuminaError {
    /// Whether the error was caused by the caller's input rather than by the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LuminaError::UnreadableFile(_)
                | LuminaError::UnsupportedFormat(_)
                | LuminaError::NoTargetFound
                | LuminaError::TargetNotFound(_)
                | LuminaError::InsufficientData(_)
                | LuminaError::AllFeaturesDegenerate { .. }
                | LuminaError::NoModelAvailable
                | LuminaError::EmptyInput
        )
    }
}

impl From<polars::error::PolarsError> for LuminaError {
    fn from(err: polars::error::PolarsError) -> Self {
        LuminaError::UnreadableFile(err.to_string())
    }
}

impl From<serde_json::Error> for LuminaError {
    fn from(err: serde_json::Error) -> Self {
        LuminaError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for LuminaError {
    fn from(err: bincode::Error) -> Self {
        LuminaError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for LuminaError {
    fn from(err: ndarray::ShapeError) -> Self {
        LuminaError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

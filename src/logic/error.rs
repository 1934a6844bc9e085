//! Error handling
//!
//! Recoverable outcomes (`EmptyDataSet`, `ModelLoad`) are ordinary values the
//! run loop retries on. Everything else ends the current cycle.

use thiserror::Error;

pub type DetectorResult<T> = Result<T, DetectorError>;

#[derive(Debug, Error)]
pub enum DetectorError {
    /// Ingest returned no records for this cycle
    #[error("Empty dataset: {0}")]
    EmptyDataSet(String),

    /// Persisted model missing or unreadable
    #[error("Could not load a model: {0}")]
    ModelLoad(String),

    /// Persisting the model failed
    #[error("Could not save the model: {0}")]
    ModelSave(String),

    /// Encoder output does not match the grid dimensionality
    #[error("Incompatible embedding shape: expected {expected}, got {actual}")]
    IncompatibleEmbeddingShape { expected: usize, actual: usize },

    /// Malformed numeric input (NaN/inf, zero-sized map, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feedback error: {0}")]
    Feedback(String),
}

impl DetectorError {
    /// Whether the outer loop should sleep and retry instead of bailing out
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DetectorError::EmptyDataSet(_) | DetectorError::ModelLoad(_))
    }
}

impl From<std::io::Error> for DetectorError {
    fn from(err: std::io::Error) -> Self {
        DetectorError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DetectorError {
    fn from(err: serde_json::Error) -> Self {
        DetectorError::Storage(err.to_string())
    }
}

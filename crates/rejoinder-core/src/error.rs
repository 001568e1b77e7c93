//! Error types for Rejoinder Core.

use thiserror::Error;

/// Result type alias for Rejoinder operations.
pub type Result<T> = std::result::Result<T, RejoinderError>;

/// Errors that can occur in Rejoinder operations.
#[derive(Error, Debug)]
pub enum RejoinderError {
    /// Input word has no vocabulary entry.
    #[error("unknown word: {0:?}")]
    UnknownWord(String),

    /// Token id outside the assigned vocabulary range.
    #[error("invalid token id: {0}")]
    InvalidId(u32),

    /// Vocabulary snapshot failed consistency checks.
    #[error("corrupt vocabulary: {0}")]
    CorruptVocabulary(String),

    /// Parameter bundle is missing a tensor or has a mismatched shape.
    #[error("model load error: {0}")]
    ModelLoad(String),

    /// Model configuration is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Shape mismatch error.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Normalizer pattern failed to compile.
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// I/O error.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// Candle tensor error.
    #[error("tensor error: {0}")]
    TensorError(#[from] candle_core::Error),
}

impl RejoinderError {
    /// Whether the error comes from the caller's input rather than the model.
    ///
    /// Only [`RejoinderError::UnknownWord`] qualifies; the request boundary
    /// answers it with a fallback reply instead of failing.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::UnknownWord(_))
    }
}

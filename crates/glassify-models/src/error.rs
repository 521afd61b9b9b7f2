//! Error types for model construction and validation.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or validating shared models.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Invalid landmarks: {0}")]
    InvalidLandmarks(String),

    #[error("Invalid pipeline config: {0}")]
    InvalidConfig(String),

    #[error("Unknown pipeline mode: {0}")]
    UnknownMode(String),

    #[error("Unknown facing mode: {0}")]
    UnknownFacing(String),
}

impl ModelError {
    pub fn invalid_landmarks(message: impl Into<String>) -> Self {
        Self::InvalidLandmarks(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

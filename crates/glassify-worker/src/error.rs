//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Face detector unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Loop task failed: {0}")]
    TaskFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] glassify_media::MediaError),

    #[error("Model error: {0}")]
    Model(#[from] glassify_models::ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn detector_unavailable(msg: impl Into<String>) -> Self {
        Self::DetectorUnavailable(msg.into())
    }

    pub fn capture_unavailable(msg: impl Into<String>) -> Self {
        Self::CaptureUnavailable(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }

    /// Whether the pipeline can never start after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DetectorUnavailable(_))
    }
}

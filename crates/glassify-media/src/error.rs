//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use glassify_models::ModelError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while preparing, estimating or compositing overlays.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Image decode failed: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Face detection failed: {0}")]
    DetectionFailed(String),

    #[error("Detector initialization failed: {0}")]
    DetectorInit(String),

    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Frame capture failed: {0}")]
    CaptureFailed(String),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create a detector initialization error.
    pub fn detector_init(message: impl Into<String>) -> Self {
        Self::DetectorInit(message.into())
    }

    /// Create a capture-unavailable error.
    pub fn capture_unavailable(message: impl Into<String>) -> Self {
        Self::CaptureUnavailable(message.into())
    }

    /// Create a frame capture error.
    pub fn capture_failed(message: impl Into<String>) -> Self {
        Self::CaptureFailed(message.into())
    }

    /// Create a degenerate geometry error.
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateGeometry(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

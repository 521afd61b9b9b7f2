//! Face landmark detection collaborators.
//!
//! The pipeline only depends on the `FaceDetector` trait. Concrete detectors
//! live in submodules; tests substitute deterministic fakes.

mod sidecar;

use async_trait::async_trait;
use glassify_models::FaceLandmarks;

use crate::error::MediaResult;
use crate::frame::Frame;

pub use sidecar::{sidecar_path, SidecarLandmarkDetector, SIDECAR_SUFFIX};

/// Landmark detector for a single face.
///
/// `Ok(None)` means no face is visible in the frame. `Err` is an internal
/// detector failure; callers treat it as "no result" for that frame.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// One-time initialisation (model loading). Failure is fatal for the pipeline.
    async fn initialize(&self) -> MediaResult<()> {
        Ok(())
    }

    /// Detect the landmarks of one face in a stream or still frame.
    async fn detect(&self, frame: &Frame) -> MediaResult<Option<FaceLandmarks>>;

    /// Detector name for logging.
    fn name(&self) -> &'static str;
}

//! User-facing notices raised by the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A message the user should see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// No face in the stream for longer than the no-face timeout.
    NoFaceInStream,
    /// The still image contains no detectable face.
    NoFaceInImage,
    /// Capture could not be acquired; the pipeline fell back to still images.
    CaptureUnavailable { reason: String },
    /// The detector failed to initialise; the pipeline will not start.
    DetectorUnavailable { reason: String },
}

impl Notice {
    /// True for notices that halt the whole feature.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Notice::DetectorUnavailable { .. })
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoFaceInStream => {
                write!(f, "No face detected. Please position your face in the camera view.")
            }
            Notice::NoFaceInImage => write!(
                f,
                "No face detected in the uploaded image. Please try another image."
            ),
            Notice::CaptureUnavailable { reason } => write!(
                f,
                "Could not access the camera ({}). Switched to still image mode.",
                reason
            ),
            Notice::DetectorUnavailable { reason } => {
                write!(f, "Failed to load face detection ({}).", reason)
            }
        }
    }
}

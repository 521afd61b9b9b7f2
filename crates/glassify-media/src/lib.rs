//! Imaging core of the Glassify overlay pipeline.
//!
//! This crate provides:
//! - Background keying and trimming of overlay assets
//! - Pose estimation from face landmarks to a placement transform
//! - Transform compositing onto a two-layer rendering surface
//! - Detector and capture collaborator traits with file-backed implementations

pub mod asset;
pub mod capture;
pub mod compositor;
pub mod detector;
pub mod error;
pub mod frame;
pub mod pose;
pub mod surface;

pub use asset::{AssetPreprocessor, NearWhiteKeyer, OverlayAsset, DEFAULT_WHITE_THRESHOLD};
pub use capture::{CaptureDevice, DirectoryCapture, VideoStream};
pub use compositor::TransformCompositor;
pub use detector::{FaceDetector, SidecarLandmarkDetector};
pub use error::{MediaError, MediaResult};
pub use frame::{load_image, load_still_frame, Frame, FrameSourceKind};
pub use pose::{estimate, PoseEstimate};
pub use surface::{RasterLayer, RasterSurface, RenderSurface, SurfaceLayer};

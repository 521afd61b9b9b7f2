//! Shared data models for the Glassify overlay pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Landmark geometry and detection results
//! - Placement transforms and the affine frame they are drawn under
//! - Pipeline configuration and capture constraints
//! - Pipeline modes and user-facing notices

pub mod config;
pub mod error;
pub mod geometry;
pub mod landmarks;
pub mod mode;
pub mod notice;
pub mod placement;

// Re-export common types
pub use config::{CaptureConstraints, FacingMode, PipelineConfig};
pub use error::{ModelError, ModelResult};
pub use geometry::{Affine2, Point2};
pub use landmarks::FaceLandmarks;
pub use mode::PipelineMode;
pub use notice::Notice;
pub use placement::PlacementTransform;

//! Pipeline configuration.
//!
//! Values here are fed by the user-facing configuration surface (manual
//! dimensions, debug toggle) and by deployment defaults (timings, capture
//! constraints).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ModelError, ModelResult};

/// Configuration recognised by the overlay pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum delay between successive detector invocations (default: 100)
    pub detection_throttle_ms: u64,

    /// Continuous face absence before a "no face" notice (default: 3000)
    pub no_face_timeout_ms: u64,

    /// Cooperative scheduler tick, one pending callback at a time (default: 16)
    pub scheduler_tick_ms: u64,

    /// Overrides the derived overlay width when set
    pub manual_width: Option<f64>,

    /// Overrides the derived overlay height when set
    pub manual_height: Option<f64>,

    /// Draw landmarks, anchor and roll ray on the diagnostic layer
    pub debug_visualization: bool,

    /// Passed through unmodified to the capture resource
    pub capture: CaptureConstraints,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detection_throttle_ms: 100, // ~10 detections per second
            no_face_timeout_ms: 3000,
            scheduler_tick_ms: 16, // ~60 Hz refresh callback
            manual_width: None,
            manual_height: None,
            debug_visualization: false,
            capture: CaptureConstraints::default(),
        }
    }
}

impl PipelineConfig {
    /// Set manual overlay dimensions.
    pub fn with_manual_size(mut self, width: Option<f64>, height: Option<f64>) -> Self {
        self.manual_width = width;
        self.manual_height = height;
        self
    }

    /// Enable or disable the diagnostic layer.
    pub fn with_debug_visualization(mut self, enabled: bool) -> Self {
        self.debug_visualization = enabled;
        self
    }

    pub fn detection_throttle(&self) -> Duration {
        Duration::from_millis(self.detection_throttle_ms)
    }

    pub fn no_face_timeout(&self) -> Duration {
        Duration::from_millis(self.no_face_timeout_ms)
    }

    pub fn scheduler_tick(&self) -> Duration {
        Duration::from_millis(self.scheduler_tick_ms)
    }

    /// Validate configuration.
    pub fn validate(&self) -> ModelResult<()> {
        if self.detection_throttle_ms == 0 {
            return Err(ModelError::invalid_config("detection_throttle_ms must be > 0"));
        }
        if self.no_face_timeout_ms == 0 {
            return Err(ModelError::invalid_config("no_face_timeout_ms must be > 0"));
        }
        if self.scheduler_tick_ms == 0 {
            return Err(ModelError::invalid_config("scheduler_tick_ms must be > 0"));
        }
        for (name, value) in [
            ("manual_width", self.manual_width),
            ("manual_height", self.manual_height),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(ModelError::invalid_config(format!(
                        "{} must be a positive number, got {}",
                        name, v
                    )));
                }
            }
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(ModelError::invalid_config("capture resolution must be non-zero"));
        }
        Ok(())
    }
}

/// Which camera the capture resource should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Front camera, facing the user.
    #[default]
    User,
    /// Rear camera.
    Environment,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FacingMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "front" => Ok(FacingMode::User),
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            _ => Err(ModelError::UnknownFacing(s.to_string())),
        }
    }
}

/// Requested capture properties; ideals, not guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CaptureConstraints {
    /// Ideal frame width (default: 640)
    pub width: u32,
    /// Ideal frame height (default: 480)
    pub height: u32,
    /// Facing preference (default: user)
    pub facing: FacingMode,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            facing: FacingMode::User,
        }
    }
}

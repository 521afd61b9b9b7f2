//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use glassify_media::DEFAULT_WHITE_THRESHOLD;
use glassify_models::{FacingMode, PipelineConfig, PipelineMode};

use crate::error::{WorkerError, WorkerResult};

/// Configuration for the `glassify` binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Pipeline timings, manual sizes and capture constraints
    pub pipeline: PipelineConfig,
    /// Mode entered at startup
    pub mode: PipelineMode,
    /// Overlay asset to load at startup
    pub asset_path: Option<PathBuf>,
    /// Face image used in single-shot mode
    pub still_image: Option<PathBuf>,
    /// Directory replayed as the capture stream
    pub frames_dir: PathBuf,
    /// How long to stream before exporting
    pub run_duration: Duration,
    /// Where the composited picture is written
    pub output_path: Option<PathBuf>,
    /// Brightness threshold for background keying
    pub white_threshold: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            mode: PipelineMode::Streaming,
            asset_path: None,
            still_image: None,
            frames_dir: PathBuf::from("frames"),
            run_duration: Duration::from_secs(5),
            output_path: None,
            white_threshold: DEFAULT_WHITE_THRESHOLD,
        }
    }
}

impl AppConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let pipeline_defaults = PipelineConfig::default();

        let pipeline = PipelineConfig {
            detection_throttle_ms: lookup("GLASSIFY_DETECTION_THROTTLE_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(pipeline_defaults.detection_throttle_ms),
            no_face_timeout_ms: lookup("GLASSIFY_NO_FACE_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(pipeline_defaults.no_face_timeout_ms),
            scheduler_tick_ms: lookup("GLASSIFY_SCHEDULER_TICK_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(pipeline_defaults.scheduler_tick_ms),
            manual_width: lookup("GLASSIFY_MANUAL_WIDTH").and_then(|s| s.parse().ok()),
            manual_height: lookup("GLASSIFY_MANUAL_HEIGHT").and_then(|s| s.parse().ok()),
            debug_visualization: lookup("GLASSIFY_DEBUG")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
            capture: glassify_models::CaptureConstraints {
                width: lookup("GLASSIFY_CAPTURE_WIDTH")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(pipeline_defaults.capture.width),
                height: lookup("GLASSIFY_CAPTURE_HEIGHT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(pipeline_defaults.capture.height),
                facing: lookup("GLASSIFY_CAPTURE_FACING")
                    .and_then(|s| s.parse::<FacingMode>().ok())
                    .unwrap_or(pipeline_defaults.capture.facing),
            },
        };

        Self {
            pipeline,
            mode: lookup("GLASSIFY_MODE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.mode),
            asset_path: lookup("GLASSIFY_ASSET").map(PathBuf::from),
            still_image: lookup("GLASSIFY_STILL_IMAGE").map(PathBuf::from),
            frames_dir: lookup("GLASSIFY_FRAMES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.frames_dir),
            run_duration: Duration::from_secs(
                lookup("GLASSIFY_RUN_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.run_duration.as_secs()),
            ),
            output_path: lookup("GLASSIFY_OUTPUT").map(PathBuf::from),
            white_threshold: lookup("GLASSIFY_WHITE_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.white_threshold),
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> WorkerResult<()> {
        self.pipeline.validate()?;
        if self.mode == PipelineMode::SingleShot && self.still_image.is_none() {
            return Err(WorkerError::config_error(
                "single-shot mode needs GLASSIFY_STILL_IMAGE",
            ));
        }
        Ok(())
    }
}

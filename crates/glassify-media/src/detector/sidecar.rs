//! Detector that reads precomputed landmarks stored next to each image.
//!
//! For a frame decoded from `frames/0001.png` the landmarks are read from
//! `frames/0001.png.landmarks.json`. Two layouts are accepted:
//!
//! ```json
//! { "jaw": [{"x": 0, "y": 0}, ...], "left_eye": [...], "right_eye": [...] }
//! { "points": [{"x": 0, "y": 0}, ...] }
//! ```
//!
//! The second form is the 68-point layout. A missing sidecar file, a JSON
//! `null`, or `{"face": null}` all mean no face is visible.

use async_trait::async_trait;
use glassify_models::{FaceLandmarks, Point2};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::FaceDetector;
use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Appended to the image file name to locate its landmarks.
pub const SIDECAR_SUFFIX: &str = ".landmarks.json";

/// Sidecar location for an image path.
pub fn sidecar_path(image_path: &Path) -> PathBuf {
    let mut name = image_path.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Reads landmarks from `<image>.landmarks.json` files.
#[derive(Debug, Clone, Default)]
pub struct SidecarLandmarkDetector {
    root: Option<PathBuf>,
}

impl SidecarLandmarkDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require that `root` exists when the detector is initialised.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn parse(path: &Path, contents: &str) -> MediaResult<Option<FaceLandmarks>> {
        let value: Value = serde_json::from_str(contents)?;
        let value = match value {
            Value::Null => return Ok(None),
            Value::Object(ref map) if map.get("face").is_some_and(Value::is_null) => {
                return Ok(None)
            }
            Value::Object(mut map) if map.contains_key("face") => {
                map.remove("face").unwrap_or(Value::Null)
            }
            other => other,
        };

        if let Some(points) = value.get("points") {
            let points: Vec<Point2> = serde_json::from_value(points.clone())?;
            return Ok(Some(FaceLandmarks::from_68_points(&points)?));
        }

        serde_json::from_value::<FaceLandmarks>(value).map(Some).map_err(|e| {
            MediaError::detection_failed(format!("invalid landmarks in {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl FaceDetector for SidecarLandmarkDetector {
    async fn initialize(&self) -> MediaResult<()> {
        if let Some(root) = &self.root {
            if !tokio::fs::try_exists(root).await? {
                return Err(MediaError::detector_init(format!(
                    "landmark directory {} does not exist",
                    root.display()
                )));
            }
        }
        info!(detector = self.name(), "Face detector initialized");
        Ok(())
    }

    async fn detect(&self, frame: &Frame) -> MediaResult<Option<FaceLandmarks>> {
        let origin = frame
            .origin()
            .ok_or_else(|| MediaError::detection_failed("frame has no source path"))?;
        let path = sidecar_path(origin);

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No landmark sidecar, treating as no face");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Self::parse(&path, &contents)
    }

    fn name(&self) -> &'static str {
        "sidecar"
    }
}

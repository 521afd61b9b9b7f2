//! Frames handed to the detector: live stream frames or still images.

use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{MediaError, MediaResult};

/// Where a frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSourceKind {
    /// A frame pulled from a capture stream.
    Stream,
    /// A still image supplied by the user.
    Still,
}

/// One frame of source pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbaImage>,
    kind: FrameSourceKind,
    origin: Option<PathBuf>,
}

impl Frame {
    /// Frame from a still image.
    pub fn still(image: impl Into<Arc<RgbaImage>>) -> Self {
        Self {
            image: image.into(),
            kind: FrameSourceKind::Still,
            origin: None,
        }
    }

    /// Frame pulled from a capture stream.
    pub fn stream(image: impl Into<Arc<RgbaImage>>) -> Self {
        Self {
            image: image.into(),
            kind: FrameSourceKind::Stream,
            origin: None,
        }
    }

    /// Attach the file the pixels were decoded from.
    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn image(&self) -> &Arc<RgbaImage> {
        &self.image
    }

    pub fn kind(&self) -> FrameSourceKind {
        self.kind
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Intrinsic pixel dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode any raster file the `image` crate understands into RGBA.
pub fn load_image(path: impl AsRef<Path>) -> MediaResult<RgbaImage> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    Ok(image::open(path)?.to_rgba8())
}

/// Decode a still image file into a `Frame` tagged with its origin.
pub fn load_still_frame(path: impl AsRef<Path>) -> MediaResult<Frame> {
    let path = path.as_ref();
    let image = load_image(path)?;
    Ok(Frame::still(image).with_origin(path))
}

//! Capture resources: acquire a live stream, pull frames, release.

use async_trait::async_trait;
use glassify_models::CaptureConstraints;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::frame::{load_image, Frame};

/// Image extensions `DirectoryCapture` picks up.
pub const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// An acquired stream of frames.
#[async_trait]
pub trait VideoStream: Send {
    /// Intrinsic frame size of the stream.
    fn dimensions(&self) -> (u32, u32);

    /// The current frame.
    async fn next_frame(&mut self) -> MediaResult<Frame>;
}

/// A capture resource that hands out at most one stream at a time.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire a stream. Constraints are passed through unmodified.
    async fn acquire(&self, constraints: &CaptureConstraints) -> MediaResult<Box<dyn VideoStream>>;

    /// Release a previously acquired stream.
    async fn release(&self, stream: Box<dyn VideoStream>);

    /// Device name for logging.
    fn name(&self) -> &'static str;
}

/// Replays the image files of a directory as a looping stream.
#[derive(Debug, Clone)]
pub struct DirectoryCapture {
    dir: PathBuf,
}

impl DirectoryCapture {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frame files in name order.
    async fn list_frames(&self) -> MediaResult<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            MediaError::capture_unavailable(format!("{}: {}", self.dir.display(), e))
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_frame {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

async fn decode_frame(path: PathBuf) -> MediaResult<Frame> {
    let origin = path.clone();
    let image = tokio::task::spawn_blocking(move || load_image(&path))
        .await
        .map_err(|e| MediaError::internal(format!("decode task failed: {}", e)))??;
    Ok(Frame::stream(image).with_origin(origin))
}

#[async_trait]
impl CaptureDevice for DirectoryCapture {
    async fn acquire(&self, constraints: &CaptureConstraints) -> MediaResult<Box<dyn VideoStream>> {
        let files = self.list_frames().await?;
        let Some(first) = files.first().cloned() else {
            return Err(MediaError::capture_unavailable(format!(
                "no frames in {}",
                self.dir.display()
            )));
        };

        let first = decode_frame(first).await?;
        let dimensions = first.dimensions();

        info!(
            dir = %self.dir.display(),
            frames = files.len(),
            width = dimensions.0,
            height = dimensions.1,
            requested_width = constraints.width,
            requested_height = constraints.height,
            facing = %constraints.facing,
            "Capture stream acquired"
        );

        Ok(Box::new(DirectoryStream {
            files,
            cursor: 0,
            dimensions,
        }))
    }

    async fn release(&self, stream: Box<dyn VideoStream>) {
        debug!(dir = %self.dir.display(), "Capture stream released");
        drop(stream);
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}

/// Stream over a fixed list of frame files, wrapping at the end.
struct DirectoryStream {
    files: Vec<PathBuf>,
    cursor: usize,
    dimensions: (u32, u32),
}

#[async_trait]
impl VideoStream for DirectoryStream {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    async fn next_frame(&mut self) -> MediaResult<Frame> {
        if self.files.is_empty() {
            return Err(MediaError::capture_failed("stream has no frames"));
        }
        let path = self.files[self.cursor % self.files.len()].clone();
        self.cursor = (self.cursor + 1) % self.files.len();
        decode_frame(path).await
    }
}

//! Deterministic collaborators shared by the worker tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use glassify_media::{
    AssetPreprocessor, FaceDetector, Frame, FrameSourceKind, MediaError, MediaResult,
    NearWhiteKeyer, OverlayAsset, VideoStream,
};
use glassify_models::{FaceLandmarks, Point2};
use image::{Rgba, RgbaImage};
use tokio::time::Instant;

/// Ordered record of collaborator calls.
pub type EventLog = Arc<std::sync::Mutex<Vec<&'static str>>>;

/// A level face in a 64x48 frame; eye midpoint at (32, 20), eye distance 24.
pub fn landmarks() -> FaceLandmarks {
    FaceLandmarks::new(
        vec![Point2::new(5.0, 10.0), Point2::new(32.0, 40.0), Point2::new(59.0, 10.0)],
        vec![
            Point2::new(15.0, 20.0),
            Point2::new(18.0, 18.0),
            Point2::new(22.0, 18.0),
            Point2::new(25.0, 20.0),
        ],
        vec![
            Point2::new(39.0, 20.0),
            Point2::new(42.0, 18.0),
            Point2::new(46.0, 18.0),
            Point2::new(49.0, 20.0),
        ],
    )
    .unwrap()
}

/// Solid dark raw asset; keying keeps all of it.
pub fn dark_raw_asset() -> RgbaImage {
    RgbaImage::from_pixel(10, 4, Rgba([20, 20, 20, 255]))
}

pub fn dark_asset() -> OverlayAsset {
    NearWhiteKeyer::default().process(Arc::new(dark_raw_asset()))
}

/// Stream that returns the same 64x48 frame forever.
pub struct StaticStream {
    image: Arc<RgbaImage>,
}

impl StaticStream {
    pub fn boxed() -> Box<dyn VideoStream> {
        Box::new(Self {
            image: Arc::new(RgbaImage::from_pixel(64, 48, Rgba([90, 90, 90, 255]))),
        })
    }
}

#[async_trait]
impl VideoStream for StaticStream {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    async fn next_frame(&mut self) -> MediaResult<Frame> {
        Ok(Frame::stream(Arc::clone(&self.image)))
    }
}

/// Detector whose answer the test controls.
#[derive(Default)]
pub struct ScriptedDetector {
    face: std::sync::Mutex<Option<FaceLandmarks>>,
    calls: std::sync::Mutex<Vec<Instant>>,
    pub fail: AtomicBool,
    pub fail_init: AtomicBool,
    events: Option<EventLog>,
}

impl ScriptedDetector {
    pub fn with_face(face: Option<FaceLandmarks>) -> Arc<Self> {
        Arc::new(Self::build(face, None))
    }

    pub fn with_events(face: Option<FaceLandmarks>, events: EventLog) -> Arc<Self> {
        Arc::new(Self::build(face, Some(events)))
    }

    fn build(face: Option<FaceLandmarks>, events: Option<EventLog>) -> Self {
        Self {
            face: std::sync::Mutex::new(face),
            events,
            ..Self::default()
        }
    }

    pub fn set_face(&self, face: Option<FaceLandmarks>) {
        *self.face.lock().unwrap() = face;
    }

    pub fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FaceDetector for ScriptedDetector {
    async fn initialize(&self) -> MediaResult<()> {
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(MediaError::detector_init("model weights missing"));
        }
        Ok(())
    }

    async fn detect(&self, frame: &Frame) -> MediaResult<Option<FaceLandmarks>> {
        self.calls.lock().unwrap().push(Instant::now());
        if let Some(events) = &self.events {
            events.lock().unwrap().push(match frame.kind() {
                FrameSourceKind::Stream => "detect_stream",
                FrameSourceKind::Still => "detect_still",
            });
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(MediaError::detection_failed("inference crashed"));
        }
        Ok(self.face.lock().unwrap().clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

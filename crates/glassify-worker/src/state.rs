//! Pipeline state shared between the coordinator and the acquisition loop.

use std::sync::Arc;

use glassify_media::{Frame, OverlayAsset};
use glassify_models::{PipelineConfig, PipelineMode};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Handle to the single pipeline state object.
pub type SharedState = Arc<Mutex<PipelineState>>;

/// All mutable pipeline state in one place.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub mode: PipelineMode,
    /// Last successful detection; stream start until the first face.
    pub last_detection_at: Instant,
    /// Last detector invocation, for the throttle gate.
    pub last_attempt_at: Option<Instant>,
    pub no_face_warning_pending: bool,
    /// Bumped on every stop; results carrying an older value are stale.
    pub generation: u64,
    pub config: PipelineConfig,
    pub asset: Option<OverlayAsset>,
    /// Face image for single-shot mode.
    pub still_image: Option<Frame>,
    /// Frame the surface was last rendered for.
    pub last_frame: Option<Frame>,
}

impl PipelineState {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            mode: PipelineMode::Stopped,
            last_detection_at: Instant::now(),
            last_attempt_at: None,
            no_face_warning_pending: false,
            generation: 0,
            config,
            asset: None,
            still_image: None,
            last_frame: None,
        }
    }

    pub fn shared(config: PipelineConfig) -> SharedState {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// Enter `mode` and return the generation that owns it.
    pub fn begin(&mut self, mode: PipelineMode, now: Instant) -> u64 {
        self.mode = mode;
        self.last_detection_at = now;
        self.last_attempt_at = None;
        self.no_face_warning_pending = false;
        self.generation
    }

    /// Stop whatever is running; outstanding work becomes stale.
    pub fn stop(&mut self) {
        self.mode = PipelineMode::Stopped;
        self.no_face_warning_pending = false;
        self.last_attempt_at = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// True while `generation` still owns an active mode.
    pub fn is_current(&self, generation: u64) -> bool {
        self.mode.is_active() && self.generation == generation
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

//! Acquisition loop controller.
//!
//! Drives repeated capture → detect → estimate → composite cycles for a
//! streaming source, and the one-off pass for a still image.
//!
//! # Architecture
//!
//! - One task per streaming session, ticking on `tokio::time::interval`
//! - The detector future is awaited inside the cycle, so cycles never overlap
//! - A `watch` channel carries shutdown; a `Notify` carries refresh requests
//! - Every resolved detection re-checks the state's mode and generation before
//!   touching the surface, so results that land after a stop are dropped

use std::sync::Arc;

use glassify_media::{
    estimate, FaceDetector, Frame, RenderSurface, TransformCompositor, VideoStream,
};
use glassify_models::{FaceLandmarks, Notice};
use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::state::{PipelineState, SharedState};

/// Handle to the compositor and the surface it owns.
pub type SharedCompositor<S> = Arc<Mutex<TransformCompositor<S>>>;

/// Holds the acquired stream while a loop borrows it.
///
/// The loop locks the slot for its whole run. The stream stays in the slot
/// even if the loop task panics, so the owner can always release it.
pub type StreamSlot = Arc<Mutex<Option<Box<dyn VideoStream>>>>;

/// Wrap an acquired stream in a fresh slot.
pub fn stream_slot(stream: Box<dyn VideoStream>) -> StreamSlot {
    Arc::new(Mutex::new(Some(stream)))
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleOutcome {
    /// Throttle gate closed; no detector call.
    Throttled,
    /// Face found and the overlay drawn.
    Rendered,
    /// Face found but no overlay asset is loaded.
    FaceWithoutAsset,
    /// Face found but the landmarks gave no drawable placement.
    Degenerate,
    /// No face, a detector error, or a capture error.
    NoFace,
    /// The owning session was stopped; nothing was rendered.
    Discarded,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Throttled => "throttled",
            CycleOutcome::Rendered => "rendered",
            CycleOutcome::FaceWithoutAsset => "face_without_asset",
            CycleOutcome::Degenerate => "degenerate",
            CycleOutcome::NoFace => "no_face",
            CycleOutcome::Discarded => "discarded",
        }
    }
}

/// Runs detection cycles against the shared state and compositor.
pub struct AcquisitionController<S> {
    state: SharedState,
    compositor: SharedCompositor<S>,
    detector: Arc<dyn FaceDetector>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl<S: RenderSurface + 'static> AcquisitionController<S> {
    pub fn new(
        state: SharedState,
        compositor: SharedCompositor<S>,
        detector: Arc<dyn FaceDetector>,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        Self {
            state,
            compositor,
            detector,
            notices,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn compositor(&self) -> &SharedCompositor<S> {
        &self.compositor
    }

    pub fn detector(&self) -> &Arc<dyn FaceDetector> {
        &self.detector
    }

    /// Streaming loop over the stream held in `slot`. The stream is left in
    /// the slot for the caller to release.
    pub async fn run(
        self: Arc<Self>,
        slot: StreamSlot,
        generation: u64,
        mut shutdown: watch::Receiver<bool>,
        refresh: Arc<Notify>,
    ) {
        let mut held = slot.lock().await;
        let Some(stream) = held.as_mut() else {
            warn!(generation, "Acquisition loop started without a stream");
            return;
        };

        let tick = self.state.lock().await.config.scheduler_tick();
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            generation,
            tick_ms = tick.as_millis() as u64,
            detector = self.detector.name(),
            "Acquisition loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
                _ = refresh.notified() => trace!("Refresh requested"),
            }

            let outcome = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    debug!(generation, "Stop requested with a cycle in flight");
                    break;
                }
                outcome = self.run_cycle(&mut **stream, generation) => outcome,
            };

            if outcome == CycleOutcome::Discarded {
                break;
            }
        }

        info!(generation, "Acquisition loop stopped");
    }

    /// One streaming cycle: throttle gate, capture, detect, then render or
    /// handle the absence of a face.
    pub async fn run_cycle(&self, stream: &mut dyn VideoStream, generation: u64) -> CycleOutcome {
        let outcome = self.stream_cycle(stream, generation).await;
        metrics::counter!("glassify_detection_cycles_total", "outcome" => outcome.as_str())
            .increment(1);
        outcome
    }

    async fn stream_cycle(&self, stream: &mut dyn VideoStream, generation: u64) -> CycleOutcome {
        {
            let mut state = self.state.lock().await;
            if !state.is_current(generation) {
                return CycleOutcome::Discarded;
            }
            let now = Instant::now();
            if let Some(last) = state.last_attempt_at {
                if now.duration_since(last) < state.config.detection_throttle() {
                    return CycleOutcome::Throttled;
                }
            }
            state.last_attempt_at = Some(now);
        }

        let frame = match stream.next_frame().await {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, "Frame capture failed, treating cycle as no face");
                None
            }
        };
        let detection = match &frame {
            Some(frame) => self.detect(frame).await,
            None => None,
        };

        let mut state = self.state.lock().await;
        if !state.is_current(generation) {
            debug!(generation, "Discarding detection resolved after stop");
            return CycleOutcome::Discarded;
        }
        if let Some(frame) = &frame {
            state.last_frame = Some(frame.clone());
        }

        match (frame, detection) {
            (Some(frame), Some(landmarks)) => {
                state.last_detection_at = Instant::now();
                state.no_face_warning_pending = false;
                self.render_detection(&state, &frame, &landmarks).await
            }
            _ => {
                self.compositor.lock().await.render_no_detection();

                let absent_for = Instant::now().duration_since(state.last_detection_at);
                if absent_for > state.config.no_face_timeout() && !state.no_face_warning_pending {
                    state.no_face_warning_pending = true;
                    info!(
                        absent_ms = absent_for.as_millis() as u64,
                        "No face in stream past timeout"
                    );
                    self.notify(Notice::NoFaceInStream);
                }
                CycleOutcome::NoFace
            }
        }
    }

    /// Single-shot pass over a still frame: no throttle, no timeout.
    pub async fn run_single_shot(&self, frame: Frame, generation: u64) -> CycleOutcome {
        let detection = self.detect(&frame).await;

        let mut state = self.state.lock().await;
        if !state.is_current(generation) {
            debug!(generation, "Discarding still-image detection resolved after stop");
            return CycleOutcome::Discarded;
        }
        state.last_frame = Some(frame.clone());

        let outcome = match detection {
            Some(landmarks) => self.render_detection(&state, &frame, &landmarks).await,
            None => {
                self.compositor.lock().await.render_no_detection();
                self.notify(Notice::NoFaceInImage);
                CycleOutcome::NoFace
            }
        };
        metrics::counter!("glassify_detection_cycles_total", "outcome" => outcome.as_str())
            .increment(1);
        outcome
    }

    /// Invoke the detector; errors count as "no face" for this frame.
    async fn detect(&self, frame: &Frame) -> Option<FaceLandmarks> {
        let started = Instant::now();
        let result = self.detector.detect(frame).await;
        metrics::histogram!("glassify_detector_latency_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    detector = self.detector.name(),
                    error = %e,
                    "Detector failed, treating frame as no face"
                );
                None
            }
        }
    }

    /// Estimate and composite while the state lock is held.
    async fn render_detection(
        &self,
        state: &PipelineState,
        frame: &Frame,
        landmarks: &FaceLandmarks,
    ) -> CycleOutcome {
        let mut compositor = self.compositor.lock().await;
        let (surface_width, surface_height) = compositor.surface().dimensions();
        let (frame_width, frame_height) = frame.dimensions();

        match estimate(
            landmarks,
            frame_width,
            frame_height,
            surface_width,
            surface_height,
            &state.config,
        ) {
            Ok(pose) => {
                compositor.render(state.asset.as_ref(), &pose, state.config.debug_visualization);
                if state.asset.is_some() {
                    CycleOutcome::Rendered
                } else {
                    CycleOutcome::FaceWithoutAsset
                }
            }
            Err(e) => {
                debug!(error = %e, "No drawable placement for detection");
                compositor.render_no_detection();
                CycleOutcome::Degenerate
            }
        }
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!("Notice receiver dropped");
        }
    }
}

//! Mode coordinator: owns the capture resource and the loop lifecycle.
//!
//! Switching modes always stops the active mode first. The coordinator waits
//! for the loop task to finish and releases the capture stream before anything
//! new is started, so at most one capture resource is ever held.

use std::sync::Arc;

use glassify_media::{
    AssetPreprocessor, CaptureDevice, FaceDetector, Frame, NearWhiteKeyer, RenderSurface,
    TransformCompositor,
};
use glassify_models::{Notice, PipelineConfig, PipelineMode};
use image::RgbaImage;
use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

use crate::acquisition::{
    stream_slot, AcquisitionController, CycleOutcome, SharedCompositor, StreamSlot,
};
use crate::error::{WorkerError, WorkerResult};
use crate::logging::SessionLogger;
use crate::state::{PipelineState, SharedState};

#[derive(Debug, Clone, PartialEq, Eq)]
enum DetectorStatus {
    Uninitialized,
    Ready,
    Failed(String),
}

/// A running streaming session.
struct ActiveStream {
    shutdown: watch::Sender<bool>,
    refresh: Arc<Notify>,
    stream: StreamSlot,
    handle: JoinHandle<()>,
}

/// Top-level owner of the pipeline.
pub struct ModeCoordinator<S> {
    controller: Arc<AcquisitionController<S>>,
    capture: Arc<dyn CaptureDevice>,
    preprocessor: Arc<dyn AssetPreprocessor>,
    notices: mpsc::UnboundedSender<Notice>,
    detector_status: DetectorStatus,
    active: Option<ActiveStream>,
    session: Option<SessionLogger>,
}

impl<S: RenderSurface + 'static> ModeCoordinator<S> {
    /// Create a stopped coordinator and the receiver for its notices.
    pub fn new(
        surface: S,
        detector: Arc<dyn FaceDetector>,
        capture: Arc<dyn CaptureDevice>,
        config: PipelineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, receiver) = mpsc::unbounded_channel();
        let state = PipelineState::shared(config);
        let compositor = Arc::new(Mutex::new(TransformCompositor::new(surface)));
        let controller = Arc::new(AcquisitionController::new(
            state,
            compositor,
            detector,
            notices.clone(),
        ));

        let coordinator = Self {
            controller,
            capture,
            preprocessor: Arc::new(NearWhiteKeyer::default()),
            notices,
            detector_status: DetectorStatus::Uninitialized,
            active: None,
            session: None,
        };
        (coordinator, receiver)
    }

    /// Replace the asset preprocessor.
    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn AssetPreprocessor>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn state(&self) -> &SharedState {
        self.controller.state()
    }

    pub fn compositor(&self) -> &SharedCompositor<S> {
        self.controller.compositor()
    }

    pub async fn mode(&self) -> PipelineMode {
        self.state().lock().await.mode
    }

    /// Run the detector's one-time initialisation.
    ///
    /// A failure is reported once as `DetectorUnavailable`; afterwards every
    /// attempt to start a mode fails with the same error.
    pub async fn initialize(&mut self) -> WorkerResult<()> {
        match &self.detector_status {
            DetectorStatus::Ready => return Ok(()),
            DetectorStatus::Failed(reason) => {
                return Err(WorkerError::detector_unavailable(reason.clone()))
            }
            DetectorStatus::Uninitialized => {}
        }

        let detector = Arc::clone(self.controller.detector());
        match detector.initialize().await {
            Ok(()) => {
                info!(detector = detector.name(), "Detector ready");
                self.detector_status = DetectorStatus::Ready;
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                error!(detector = detector.name(), error = %reason, "Detector failed to initialize");
                self.detector_status = DetectorStatus::Failed(reason.clone());
                self.notify(Notice::DetectorUnavailable {
                    reason: reason.clone(),
                });
                Err(WorkerError::detector_unavailable(reason))
            }
        }
    }

    /// Switch modes. Returns the mode actually entered, which is `SingleShot`
    /// when streaming was requested but capture could not be acquired.
    ///
    /// Detector and configuration errors are reported before the current mode
    /// is stopped.
    pub async fn set_mode(&mut self, mode: PipelineMode) -> WorkerResult<PipelineMode> {
        if mode.is_active() {
            self.initialize().await?;
            self.state().lock().await.config.validate()?;
        }

        self.stop().await?;

        match mode {
            PipelineMode::Stopped => Ok(PipelineMode::Stopped),
            PipelineMode::Streaming => self.start_streaming().await,
            PipelineMode::SingleShot => {
                self.start_single_shot().await;
                Ok(PipelineMode::SingleShot)
            }
        }
    }

    /// Replace the overlay asset and re-run the current cycle.
    pub async fn set_asset(&mut self, raw: RgbaImage) -> Option<CycleOutcome> {
        let asset = self.preprocessor.process(Arc::new(raw));
        let (width, height) = asset.processed().dimensions();
        info!(
            preprocessor = self.preprocessor.name(),
            width,
            height,
            fallback = asset.is_fallback(),
            "Overlay asset loaded"
        );
        self.state().lock().await.asset = Some(asset);
        self.rerun().await
    }

    /// Apply a new configuration and re-run the current cycle.
    ///
    /// Capture constraints and the scheduler tick take effect on the next
    /// streaming start.
    pub async fn set_config(&mut self, config: PipelineConfig) -> WorkerResult<Option<CycleOutcome>> {
        config.validate()?;
        debug!(?config, "Pipeline config updated");
        self.state().lock().await.config = config;
        Ok(self.rerun().await)
    }

    /// Supply the face image for single-shot mode; re-runs if that mode is active.
    pub async fn set_still_image(&mut self, frame: Frame) -> Option<CycleOutcome> {
        self.state().lock().await.still_image = Some(frame);
        self.rerun().await
    }

    /// Stop everything.
    pub async fn shutdown(&mut self) -> WorkerResult<()> {
        self.stop().await
    }

    /// Stop the active mode, release capture and clear the surface.
    async fn stop(&mut self) -> WorkerResult<()> {
        let previous = {
            let mut state = self.state().lock().await;
            let previous = state.mode;
            state.stop();
            previous
        };

        let mut result = Ok(());
        if let Some(active) = self.active.take() {
            let _ = active.shutdown.send(true);
            if let Err(e) = active.handle.await {
                warn!(error = %e, "Acquisition loop ended abnormally");
                result = Err(WorkerError::task_failed(e.to_string()));
            }
            // Released whether the loop exited cleanly or not.
            let stream = active.stream.lock().await.take();
            if let Some(stream) = stream {
                self.capture.release(stream).await;
                debug!(capture = self.capture.name(), "Capture released");
            }
        }

        self.compositor().lock().await.clear_all();

        if let Some(session) = self.session.take() {
            session.log_stop(&format!("left {}", previous));
        }
        result
    }

    async fn start_streaming(&mut self) -> WorkerResult<PipelineMode> {
        let constraints = self.state().lock().await.config.capture;

        let stream = match self.capture.acquire(&constraints).await {
            Ok(stream) => stream,
            Err(e) => {
                let reason = e.to_string();
                warn!(
                    capture = self.capture.name(),
                    error = %reason,
                    "Capture unavailable, falling back to single-shot"
                );
                let notice = Notice::CaptureUnavailable { reason };
                SessionLogger::new(PipelineMode::Streaming).log_notice(&notice);
                self.notify(notice);
                self.start_single_shot().await;
                return Ok(PipelineMode::SingleShot);
            }
        };

        let (width, height) = stream.dimensions();
        self.compositor().lock().await.resize(width, height);

        let generation = self
            .state()
            .lock()
            .await
            .begin(PipelineMode::Streaming, Instant::now());

        let session = SessionLogger::new(PipelineMode::Streaming);
        session.log_start(&format!("{} capture at {}x{}", self.capture.name(), width, height));

        let (shutdown, shutdown_rx) = watch::channel(false);
        let refresh = Arc::new(Notify::new());
        let slot = stream_slot(stream);
        let handle = tokio::spawn(
            Arc::clone(&self.controller)
                .run(Arc::clone(&slot), generation, shutdown_rx, Arc::clone(&refresh))
                .instrument(session.create_span()),
        );

        self.active = Some(ActiveStream {
            shutdown,
            refresh,
            stream: slot,
            handle,
        });
        self.session = Some(session);
        Ok(PipelineMode::Streaming)
    }

    async fn start_single_shot(&mut self) -> Option<CycleOutcome> {
        let generation = self
            .state()
            .lock()
            .await
            .begin(PipelineMode::SingleShot, Instant::now());

        let session = SessionLogger::new(PipelineMode::SingleShot);
        session.log_start("awaiting still image");
        self.session = Some(session);

        self.run_still(generation).await
    }

    /// Single-shot pass over the stored still image, if any.
    async fn run_still(&self, generation: u64) -> Option<CycleOutcome> {
        let frame = self.state().lock().await.still_image.clone()?;
        self.compositor()
            .lock()
            .await
            .resize(frame.width(), frame.height());
        Some(self.controller.run_single_shot(frame, generation).await)
    }

    /// One extra pass for the current mode.
    async fn rerun(&self) -> Option<CycleOutcome> {
        let (mode, generation) = {
            let state = self.state().lock().await;
            (state.mode, state.generation)
        };
        match mode {
            PipelineMode::Streaming => {
                if let Some(active) = &self.active {
                    active.refresh.notify_one();
                }
                None
            }
            PipelineMode::SingleShot => self.run_still(generation).await,
            PipelineMode::Stopped => None,
        }
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!("Notice receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dark_raw_asset, landmarks, EventLog, ScriptedDetector, StaticStream};
    use async_trait::async_trait;
    use glassify_media::{MediaError, MediaResult, RasterSurface, VideoStream};
    use glassify_models::CaptureConstraints;
    use mockall::mock;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    mock! {
        pub Capture {}

        #[async_trait]
        impl CaptureDevice for Capture {
            async fn acquire(&self, constraints: &CaptureConstraints) -> MediaResult<Box<dyn VideoStream>>;
            async fn release(&self, stream: Box<dyn VideoStream>);
            fn name(&self) -> &'static str;
        }
    }

    /// Capture that records acquire/release into `events`.
    fn logged_capture(events: &EventLog, acquires: usize) -> MockCapture {
        let mut capture = MockCapture::new();
        capture.expect_name().return_const("mock");
        let on_acquire = Arc::clone(events);
        capture
            .expect_acquire()
            .times(acquires)
            .returning(move |_| {
                on_acquire.lock().unwrap().push("acquire");
                Ok(StaticStream::boxed())
            });
        let on_release = Arc::clone(events);
        capture
            .expect_release()
            .times(acquires)
            .returning(move |_| on_release.lock().unwrap().push("release"));
        capture
    }

    fn coordinator(
        detector: Arc<ScriptedDetector>,
        capture: MockCapture,
    ) -> (ModeCoordinator<RasterSurface>, mpsc::UnboundedReceiver<Notice>) {
        ModeCoordinator::new(
            RasterSurface::new(640, 480),
            detector,
            Arc::new(capture),
            PipelineConfig::default(),
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            out.push(notice);
        }
        out
    }

    fn still_frame() -> Frame {
        Frame::still(RgbaImage::from_pixel(64, 48, image::Rgba([120, 110, 100, 255])))
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_to_single_shot_releases_capture_first() {
        let events: EventLog = Default::default();
        let detector = ScriptedDetector::with_events(Some(landmarks()), Arc::clone(&events));
        let (mut coord, _rx) = coordinator(detector, logged_capture(&events, 1));

        assert_eq!(coord.set_mode(PipelineMode::Streaming).await.unwrap(), PipelineMode::Streaming);
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(coord.set_still_image(still_frame()).await, None);
        assert_eq!(coord.set_mode(PipelineMode::SingleShot).await.unwrap(), PipelineMode::SingleShot);

        let events = events.lock().unwrap().clone();
        let release = events.iter().position(|e| *e == "release").unwrap();
        let still = events.iter().position(|e| *e == "detect_still").unwrap();
        assert!(release < still, "events: {:?}", events);
        assert!(events[release..].iter().all(|e| *e != "detect_stream"));
        assert!(events[..release].contains(&"detect_stream"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarting_stream_never_holds_two_captures() {
        let events: EventLog = Default::default();
        let detector = ScriptedDetector::with_face(None);
        let (mut coord, _rx) = coordinator(detector, logged_capture(&events, 2));

        coord.set_mode(PipelineMode::Streaming).await.unwrap();
        coord.set_mode(PipelineMode::Streaming).await.unwrap();
        coord.shutdown().await.unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["acquire", "release", "acquire", "release"]
        );
        assert_eq!(coord.mode().await, PipelineMode::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_renders_then_stop_clears_surface() {
        let events: EventLog = Default::default();
        let detector = ScriptedDetector::with_face(Some(landmarks()));
        let (mut coord, _rx) = coordinator(detector, logged_capture(&events, 1));

        coord.set_asset(dark_raw_asset()).await;
        coord.set_mode(PipelineMode::Streaming).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        {
            let compositor = coord.compositor().lock().await;
            // Surface follows the stream size.
            assert_eq!(compositor.surface().dimensions(), (64, 48));
            assert!(!compositor.surface().overlay().is_blank());
        }

        coord.set_mode(PipelineMode::Stopped).await.unwrap();
        assert!(coord.compositor().lock().await.surface().overlay().is_blank());
        assert_eq!(events.lock().unwrap().last(), Some(&"release"));
    }

    /// Stream whose driver faults on the first frame.
    struct FaultyStream;

    #[async_trait]
    impl VideoStream for FaultyStream {
        fn dimensions(&self) -> (u32, u32) {
            (64, 48)
        }

        async fn next_frame(&mut self) -> MediaResult<Frame> {
            panic!("driver fault");
        }
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_capture() {
        let mut capture = MockCapture::new();
        capture.expect_name().return_const("mock");
        capture.expect_acquire().times(0);
        capture.expect_release().times(0);

        let config = PipelineConfig {
            scheduler_tick_ms: 0,
            ..PipelineConfig::default()
        };
        let (mut coord, _rx) = ModeCoordinator::new(
            RasterSurface::new(640, 480),
            ScriptedDetector::with_face(Some(landmarks())),
            Arc::new(capture),
            config,
        );

        assert!(matches!(
            coord.set_mode(PipelineMode::Streaming).await,
            Err(WorkerError::Model(_))
        ));
        assert_eq!(coord.mode().await, PipelineMode::Stopped);
        coord.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_crashed_loop_still_releases_capture() {
        let events: EventLog = Default::default();
        let mut capture = MockCapture::new();
        capture.expect_name().return_const("mock");
        capture
            .expect_acquire()
            .times(1)
            .returning(|_| Ok(Box::new(FaultyStream) as Box<dyn VideoStream>));
        let on_release = Arc::clone(&events);
        capture
            .expect_release()
            .times(1)
            .returning(move |_| on_release.lock().unwrap().push("release"));

        let (mut coord, _rx) = coordinator(ScriptedDetector::with_face(None), capture);
        assert_eq!(coord.set_mode(PipelineMode::Streaming).await.unwrap(), PipelineMode::Streaming);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(matches!(
            coord.shutdown().await,
            Err(WorkerError::TaskFailed(_))
        ));
        assert_eq!(*events.lock().unwrap(), vec!["release"]);
        assert!(coord.compositor().lock().await.surface().overlay().is_blank());
    }

    #[tokio::test]
    async fn test_capture_failure_falls_back_to_single_shot() {
        let mut capture = MockCapture::new();
        capture.expect_name().return_const("mock");
        capture
            .expect_acquire()
            .times(1)
            .returning(|_| Err(MediaError::capture_unavailable("permission denied")));
        capture.expect_release().times(0);

        let detector = ScriptedDetector::with_face(None);
        let (mut coord, mut rx) = coordinator(detector, capture);

        assert_eq!(coord.set_mode(PipelineMode::Streaming).await.unwrap(), PipelineMode::SingleShot);
        assert_eq!(coord.mode().await, PipelineMode::SingleShot);

        let notices = drain(&mut rx);
        assert_eq!(notices.len(), 1);
        match &notices[0] {
            Notice::CaptureUnavailable { reason } => assert!(reason.contains("permission denied")),
            other => panic!("unexpected notice {:?}", other),
        }

        // The fallback mode works: a still image gets its immediate verdict.
        assert_eq!(coord.set_still_image(still_frame()).await, Some(CycleOutcome::NoFace));
        assert_eq!(drain(&mut rx), vec![Notice::NoFaceInImage]);
    }

    #[tokio::test]
    async fn test_detector_init_failure_is_fatal() {
        let mut capture = MockCapture::new();
        capture.expect_name().return_const("mock");
        capture.expect_acquire().times(0);

        let detector = ScriptedDetector::with_face(Some(landmarks()));
        detector.fail_init.store(true, Ordering::SeqCst);
        let (mut coord, mut rx) = coordinator(detector, capture);

        assert!(matches!(
            coord.initialize().await,
            Err(WorkerError::DetectorUnavailable(_))
        ));
        let err = coord.set_mode(PipelineMode::Streaming).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(coord.set_mode(PipelineMode::SingleShot).await.is_err());

        let notices = drain(&mut rx);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_fatal());
        assert_eq!(coord.mode().await, PipelineMode::Stopped);
    }

    #[tokio::test]
    async fn test_asset_and_config_changes_rerun_single_shot() {
        let mut capture = MockCapture::new();
        capture.expect_name().return_const("mock");

        let detector = ScriptedDetector::with_face(Some(landmarks()));
        let (mut coord, _rx) = coordinator(detector.clone(), capture);

        coord.set_mode(PipelineMode::SingleShot).await.unwrap();
        assert_eq!(
            coord.set_still_image(still_frame()).await,
            Some(CycleOutcome::FaceWithoutAsset)
        );
        assert_eq!(coord.set_asset(dark_raw_asset()).await, Some(CycleOutcome::Rendered));

        let config = PipelineConfig::default().with_manual_size(Some(10.0), Some(4.0));
        assert_eq!(
            coord.set_config(config).await.unwrap(),
            Some(CycleOutcome::Rendered)
        );
        {
            let compositor = coord.compositor().lock().await;
            let overlay = compositor.surface().overlay().image();
            assert_eq!(overlay.get_pixel(32, 20).0[3], 255);
            // Manual 10px width: nothing drawn 10px left of the anchor.
            assert_eq!(overlay.get_pixel(22, 20).0[3], 0);
        }
        assert_eq!(detector.calls().len(), 3);

        let bad = PipelineConfig::default().with_manual_size(Some(-1.0), None);
        assert!(matches!(
            coord.set_config(bad).await,
            Err(WorkerError::Model(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_asset_change_refreshes_running_stream() {
        let events: EventLog = Default::default();
        let detector = ScriptedDetector::with_face(Some(landmarks()));
        let (mut coord, _rx) = coordinator(detector.clone(), logged_capture(&events, 1));

        let config = PipelineConfig {
            scheduler_tick_ms: 60_000,
            ..PipelineConfig::default()
        };
        coord.set_config(config).await.unwrap();
        coord.set_mode(PipelineMode::Streaming).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(detector.calls().len(), 1);
        assert!(coord.compositor().lock().await.surface().overlay().is_blank());

        assert_eq!(coord.set_asset(dark_raw_asset()).await, None);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(detector.calls().len(), 2);
        assert!(!coord.compositor().lock().await.surface().overlay().is_blank());

        coord.shutdown().await.unwrap();
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::liveness::domain::captured_image::{CaptureTrigger, CapturedImage};
use crate::liveness::domain::challenge_evaluator::{evaluate_faces, ChallengeConfig};
use crate::liveness::domain::challenge_state::ChallengeState;
use crate::liveness::domain::nose_marker_overlay::{render_nose_marker, Overlay};
use crate::liveness::domain::session_phase::{SessionPhase, SessionSnapshot};
use crate::shared::constants::{DEFAULT_CAPTURE_DELAY, DEFAULT_READY_POLL_INTERVAL, NOSE_TIP_INDEX};
use crate::shared::frame::Frame;
use crate::video::domain::frame_encoder::FrameEncoder;
use crate::video::domain::video_source::VideoSource;

use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Granularity of sleeps while waiting out a pending capture, so that
/// cancellation stays responsive.
const DEADLINE_SLICE: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LivenessConfig {
    /// Delay between readiness checks of the video source.
    pub poll_interval: Duration,
    /// Delay between passing the challenge and the automatic capture.
    pub capture_delay: Duration,
    /// Give up on a source that is still not ready after this long.
    /// `None` waits until cancelled.
    pub ready_timeout: Option<Duration>,
    pub challenge: ChallengeConfig,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_READY_POLL_INTERVAL,
            capture_delay: DEFAULT_CAPTURE_DELAY,
            ready_timeout: None,
            challenge: ChallengeConfig::default(),
        }
    }
}

impl LivenessConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval.is_zero() {
            return Err("Poll interval must be greater than zero".to_string());
        }
        self.challenge.validate()
    }
}

/// Errors that end a liveness session. Per-frame conditions such as a
/// missing face never surface here.
#[derive(Error, Debug)]
pub enum LivenessError {
    #[error("Video source not ready after {0:?}")]
    SourceNotReady(Duration),
    #[error("Video source failed: {0}")]
    Source(String),
    #[error("Landmark detection failed: {0}")]
    Detection(String),
    #[error("Failed to encode captured frame: {0}")]
    Encode(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    Captured,
    Cancelled,
    SourceEnded,
}

/// Cross-thread control of a running session.
///
/// Clones share the same flags, so a UI thread can hold one while the
/// session thread holds another.
#[derive(Clone, Debug, Default)]
pub struct SessionHandle {
    cancelled: Arc<AtomicBool>,
    capture_requested: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Operator override: capture the current frame without waiting for the
    /// challenge to pass.
    pub fn request_capture(&self) {
        self.capture_requested.store(true, Ordering::Relaxed);
    }

    pub fn capture_requested(&self) -> bool {
        self.capture_requested.load(Ordering::Relaxed)
    }

    fn take_capture_request(&self) -> bool {
        self.capture_requested.swap(false, Ordering::Relaxed)
    }
}

type CaptureCallback = Box<dyn FnMut(CapturedImage) + Send>;
type UpdateCallback = Box<dyn FnMut(SessionSnapshot) + Send>;
type OverlayCallback = Box<dyn FnMut(Overlay) + Send>;

/// One head-turn liveness session.
///
/// Pulls a frame, waits for the detector, updates the challenge state, and
/// only then pulls the next frame. Once both turns are seen a single capture
/// is scheduled after `capture_delay`. The session owns all of its mutable
/// state; nothing is shared between sessions.
pub struct LivenessPipeline {
    source: Box<dyn VideoSource>,
    detector: Box<dyn LandmarkDetector>,
    encoder: Box<dyn FrameEncoder>,
    logger: Box<dyn PipelineLogger>,
    config: LivenessConfig,
    state: ChallengeState,
    phase: SessionPhase,
    last_published: Option<SessionSnapshot>,
    last_frame: Option<Frame>,
    capture_deadline: Option<Instant>,
    on_capture: Option<CaptureCallback>,
    on_update: Option<UpdateCallback>,
    on_overlay: Option<OverlayCallback>,
    torn_down: bool,
}

impl LivenessPipeline {
    pub fn new(
        source: Box<dyn VideoSource>,
        detector: Box<dyn LandmarkDetector>,
        encoder: Box<dyn FrameEncoder>,
        config: LivenessConfig,
    ) -> Self {
        Self {
            source,
            detector,
            encoder,
            logger: Box::new(NullPipelineLogger),
            config,
            state: ChallengeState::new(),
            phase: SessionPhase::Initializing,
            last_published: None,
            last_frame: None,
            capture_deadline: None,
            on_capture: None,
            on_update: None,
            on_overlay: None,
            torn_down: false,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Receives the captured image. Called at most once per session.
    pub fn on_capture(mut self, callback: impl FnMut(CapturedImage) + Send + 'static) -> Self {
        self.on_capture = Some(Box::new(callback));
        self
    }

    /// Receives every change of phase or challenge flags.
    pub fn on_update(mut self, callback: impl FnMut(SessionSnapshot) + Send + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    /// Receives the nose-marker overlay for each frame with a face.
    pub fn on_overlay(mut self, callback: impl FnMut(Overlay) + Send + 'static) -> Self {
        self.on_overlay = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            state: self.state,
        }
    }

    /// Runs the session to completion and tears it down, whatever the outcome.
    /// A session that was already torn down does not start again and reports
    /// `Cancelled`.
    pub fn run(&mut self, handle: &SessionHandle) -> Result<SessionOutcome, LivenessError> {
        if self.torn_down {
            log::warn!("Liveness session already ended, not restarting");
            return Ok(SessionOutcome::Cancelled);
        }
        let result = self.run_session(handle);
        self.teardown();
        match &result {
            Ok(outcome) => self.logger.info(&format!("Liveness session ended: {outcome:?}")),
            Err(e) => log::warn!("Liveness session failed: {e}"),
        }
        self.logger.summary();
        result
    }

    /// Captures the most recent frame. Returns `Ok(false)` without doing
    /// anything when the session already captured, has been torn down, or
    /// has no usable frame yet.
    pub fn capture_now(&mut self, trigger: CaptureTrigger) -> Result<bool, LivenessError> {
        if self.torn_down {
            log::debug!("Session torn down, ignoring {trigger:?} capture");
            return Ok(false);
        }
        if self.state.captured() {
            log::debug!("Capture already taken, ignoring {trigger:?} request");
            return Ok(false);
        }
        let Some(frame) = self.last_frame.as_ref() else {
            return Ok(false);
        };
        if frame.is_empty() {
            log::debug!("Frame {} has no picture, deferring capture", frame.index());
            return Ok(false);
        }

        let started = Instant::now();
        let bytes = self
            .encoder
            .encode(frame)
            .map_err(|e| LivenessError::Encode(e.to_string()))?;
        self.logger
            .timing("encode", started.elapsed().as_secs_f64() * 1000.0);

        let image = CapturedImage {
            bytes,
            mime_type: self.encoder.mime_type(),
            width: frame.width(),
            height: frame.height(),
            frame_index: frame.index(),
            trigger,
        };

        self.state.mark_captured();
        self.capture_deadline = None;
        self.set_phase(SessionPhase::Captured);
        self.logger.info(&format!(
            "Captured frame {} ({}x{}, {:?})",
            image.frame_index, image.width, image.height, trigger
        ));
        if let Some(callback) = self.on_capture.as_mut() {
            callback(image);
        }
        Ok(true)
    }

    /// Clears the pending capture and stops the source. Safe to call more
    /// than once; stop errors are logged and dropped.
    pub fn teardown(&mut self) {
        self.capture_deadline = None;
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Err(e) = self.source.stop() {
            log::debug!("Ignoring error while stopping video source: {e}");
        }
    }

    fn run_session(&mut self, handle: &SessionHandle) -> Result<SessionOutcome, LivenessError> {
        self.publish();
        self.set_phase(SessionPhase::WaitingForSource);
        if !self.wait_for_source(handle)? {
            return Ok(SessionOutcome::Cancelled);
        }
        log::info!("Video source ready");

        loop {
            if handle.is_cancelled() {
                return Ok(SessionOutcome::Cancelled);
            }
            self.take_manual_capture(handle)?;
            if self.deadline_reached() {
                self.capture_now(CaptureTrigger::Automatic)?;
            }
            if self.state.captured() {
                return Ok(SessionOutcome::Captured);
            }

            let next = self
                .source
                .next_frame()
                .map_err(|e| LivenessError::Source(e.to_string()))?;
            match next {
                Some(frame) => self.process_frame(frame)?,
                None => return self.finish_after_source_end(handle),
            }
        }
    }

    /// Returns `Ok(false)` if cancelled while waiting.
    fn wait_for_source(&mut self, handle: &SessionHandle) -> Result<bool, LivenessError> {
        let started = Instant::now();
        loop {
            if handle.is_cancelled() {
                return Ok(false);
            }
            if self.source.is_ready() {
                return Ok(true);
            }
            if let Some(timeout) = self.config.ready_timeout {
                if started.elapsed() >= timeout {
                    return Err(LivenessError::SourceNotReady(timeout));
                }
            }
            log::debug!(
                "Video source not ready, retrying in {:?}",
                self.config.poll_interval
            );
            thread::sleep(self.config.poll_interval);
        }
    }

    fn process_frame(&mut self, frame: Frame) -> Result<(), LivenessError> {
        let started = Instant::now();
        let faces = self
            .detector
            .detect(&frame)
            .map_err(|e| LivenessError::Detection(e.to_string()))?;
        self.logger
            .timing("detect", started.elapsed().as_secs_f64() * 1000.0);
        self.logger.frame(frame.index(), !faces.is_empty());

        let evaluation = evaluate_faces(&mut self.state, &faces, &self.config.challenge);
        if let Some(pose) = evaluation.pose {
            self.logger.metric("nose_offset", pose.nose_offset);
            self.logger.metric("face_width", pose.face_width);
        }

        if let (Some(callback), Some(face)) = (self.on_overlay.as_mut(), faces.first()) {
            if let Some(nose) = face.point(NOSE_TIP_INDEX) {
                callback(render_nose_marker(
                    frame.width(),
                    frame.height(),
                    frame.index(),
                    nose,
                ));
            }
        }

        self.last_frame = Some(frame);
        self.set_phase(evaluation.phase);

        if evaluation.phase == SessionPhase::Passed && self.capture_deadline.is_none() {
            log::info!(
                "Liveness passed, capturing in {:?}",
                self.config.capture_delay
            );
            self.capture_deadline = Some(Instant::now() + self.config.capture_delay);
        }
        Ok(())
    }

    /// A pending automatic or manual capture still fires on the last frame.
    fn finish_after_source_end(
        &mut self,
        handle: &SessionHandle,
    ) -> Result<SessionOutcome, LivenessError> {
        log::info!("Video source ended");
        if self.take_manual_capture(handle)? {
            return Ok(SessionOutcome::Captured);
        }
        let Some(deadline) = self.capture_deadline else {
            return Ok(SessionOutcome::SourceEnded);
        };
        while Instant::now() < deadline {
            if handle.is_cancelled() {
                return Ok(SessionOutcome::Cancelled);
            }
            thread::sleep(DEADLINE_SLICE.min(deadline.saturating_duration_since(Instant::now())));
        }
        if self.capture_now(CaptureTrigger::Automatic)? {
            Ok(SessionOutcome::Captured)
        } else {
            Ok(SessionOutcome::SourceEnded)
        }
    }

    /// Honors a pending operator request. A request that cannot be served
    /// yet stays pending on the handle.
    fn take_manual_capture(&mut self, handle: &SessionHandle) -> Result<bool, LivenessError> {
        if !handle.take_capture_request() {
            return Ok(false);
        }
        let captured = self.capture_now(CaptureTrigger::Manual)?;
        if !captured && !self.state.captured() {
            handle.request_capture();
        }
        Ok(captured)
    }

    fn deadline_reached(&self) -> bool {
        self.capture_deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if phase != self.phase {
            log::debug!("Phase {:?} -> {:?}", self.phase, phase);
        }
        self.phase = phase;
        self.publish();
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        if self.last_published == Some(snapshot) {
            return;
        }
        self.last_published = Some(snapshot);
        if let Some(callback) = self.on_update.as_mut() {
            callback(snapshot);
        }
    }
}

impl Drop for LivenessPipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_mesh::{FaceMesh, LandmarkPoint};
    use crate::shared::constants::{LEFT_FACE_EDGE_INDEX, RIGHT_FACE_EDGE_INDEX};
    use crate::video::infrastructure::png_frame_encoder::PngFrameEncoder;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    // --- Stubs ---

    struct StubSource {
        frames: VecDeque<Frame>,
        ready_after: usize,
        polls: usize,
        fail_stop: bool,
        stops: Arc<Mutex<usize>>,
    }

    impl StubSource {
        fn new(count: usize) -> Self {
            Self {
                frames: (0..count).map(|i| Frame::filled(8, 6, [10, 20, 30], i)).collect(),
                ready_after: 0,
                polls: 0,
                fail_stop: false,
                stops: Arc::new(Mutex::new(0)),
            }
        }
    }

    impl VideoSource for StubSource {
        fn is_ready(&mut self) -> bool {
            self.polls += 1;
            self.polls > self.ready_after
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            Ok(self.frames.pop_front())
        }

        fn stop(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            *self.stops.lock().unwrap() += 1;
            if self.fail_stop {
                return Err("device busy".into());
            }
            Ok(())
        }
    }

    /// Nose offsets by frame index; frames not listed have no face.
    struct StubDetector {
        offsets: HashMap<usize, f64>,
    }

    impl StubDetector {
        fn new(offsets: &[(usize, f64)]) -> Self {
            Self {
                offsets: offsets.iter().copied().collect(),
            }
        }
    }

    impl LandmarkDetector for StubDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceMesh>, Box<dyn std::error::Error>> {
            Ok(self
                .offsets
                .get(&frame.index())
                .map(|&offset| vec![face_with_offset(offset)])
                .unwrap_or_default())
        }
    }

    struct FailingDetector;

    impl LandmarkDetector for FailingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceMesh>, Box<dyn std::error::Error>> {
            Err("model not loaded".into())
        }
    }

    fn face_with_offset(offset: f64) -> FaceMesh {
        let mut points = vec![LandmarkPoint::new(0.5, 0.5); RIGHT_FACE_EDGE_INDEX + 1];
        points[LEFT_FACE_EDGE_INDEX] = LandmarkPoint::new(0.4, 0.5);
        points[RIGHT_FACE_EDGE_INDEX] = LandmarkPoint::new(0.6, 0.5);
        points[NOSE_TIP_INDEX] = LandmarkPoint::new(0.5 + offset * 0.2, 0.45);
        FaceMesh::new(points)
    }

    fn fast_config(capture_delay: Duration) -> LivenessConfig {
        LivenessConfig {
            poll_interval: Duration::from_millis(1),
            capture_delay,
            ..LivenessConfig::default()
        }
    }

    fn pipeline(
        source: StubSource,
        detector: impl LandmarkDetector + 'static,
        config: LivenessConfig,
    ) -> (LivenessPipeline, Arc<Mutex<Vec<CapturedImage>>>) {
        let captures = Arc::new(Mutex::new(Vec::new()));
        let sink = captures.clone();
        let pipeline = LivenessPipeline::new(
            Box::new(source),
            Box::new(detector),
            Box::new(PngFrameEncoder::new()),
            config,
        )
        .on_capture(move |image| sink.lock().unwrap().push(image));
        (pipeline, captures)
    }

    // --- Tests ---

    #[test]
    fn test_faceless_stream_ends_without_capture() {
        let (mut pipeline, captures) = pipeline(
            StubSource::new(5),
            StubDetector::new(&[]),
            fast_config(Duration::ZERO),
        );

        let outcome = pipeline.run(&SessionHandle::new()).unwrap();

        assert_eq!(outcome, SessionOutcome::SourceEnded);
        assert_eq!(pipeline.phase(), SessionPhase::NoFace);
        let state = pipeline.state();
        assert!(!state.face_present());
        assert!(!state.turned_left());
        assert!(!state.turned_right());
        assert!(captures.lock().unwrap().is_empty());
    }

    #[test]
    fn test_left_then_right_captures_once() {
        let (mut pipeline, captures) = pipeline(
            StubSource::new(6),
            StubDetector::new(&[(0, -0.2), (1, 0.0), (2, 0.15), (3, 0.15), (4, 0.15)]),
            fast_config(Duration::ZERO),
        );

        let outcome = pipeline.run(&SessionHandle::new()).unwrap();

        assert_eq!(outcome, SessionOutcome::Captured);
        assert!(pipeline.state().passed());
        assert!(pipeline.state().captured());
        let captures = captures.lock().unwrap();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].frame_index, 2);
        assert_eq!(captures[0].trigger, CaptureTrigger::Automatic);
        assert_eq!(captures[0].mime_type, "image/png");
        assert_eq!(&captures[0].bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_updates_follow_challenge_order() {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = phases.clone();
        let (pipeline, _) = pipeline(
            StubSource::new(4),
            StubDetector::new(&[(1, -0.2), (2, 0.2)]),
            fast_config(Duration::ZERO),
        );
        let mut pipeline = pipeline.on_update(move |snapshot| sink.lock().unwrap().push(snapshot.phase));

        pipeline.run(&SessionHandle::new()).unwrap();

        let mut seen = phases.lock().unwrap().clone();
        seen.dedup();
        assert_eq!(
            seen,
            vec![
                SessionPhase::Initializing,
                SessionPhase::WaitingForSource,
                SessionPhase::NoFace,
                SessionPhase::ChallengeRight,
                SessionPhase::Passed,
                SessionPhase::Captured,
            ]
        );
    }

    #[test]
    fn test_manual_capture_before_any_turn() {
        let (mut pipeline, captures) = pipeline(
            StubSource::new(5),
            StubDetector::new(&[]),
            fast_config(Duration::ZERO),
        );
        let handle = SessionHandle::new();
        handle.request_capture();

        let outcome = pipeline.run(&handle).unwrap();

        assert_eq!(outcome, SessionOutcome::Captured);
        assert!(!pipeline.state().turned_left());
        let captures = captures.lock().unwrap();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].trigger, CaptureTrigger::Manual);
        assert_eq!(captures[0].frame_index, 0);
    }

    #[test]
    fn test_manual_capture_without_frames_stays_pending() {
        let (mut pipeline, captures) = pipeline(
            StubSource::new(0),
            StubDetector::new(&[]),
            fast_config(Duration::ZERO),
        );
        let handle = SessionHandle::new();
        handle.request_capture();

        let outcome = pipeline.run(&handle).unwrap();

        assert_eq!(outcome, SessionOutcome::SourceEnded);
        assert!(captures.lock().unwrap().is_empty());
        assert!(handle.capture_requested());
    }

    #[test]
    fn test_repeated_passed_frames_yield_one_capture() {
        let (mut pipeline, captures) = pipeline(
            StubSource::new(4),
            StubDetector::new(&[(0, -0.3), (1, 0.3), (2, 0.3), (3, 0.3)]),
            fast_config(Duration::from_millis(20)),
        );

        let outcome = pipeline.run(&SessionHandle::new()).unwrap();
        assert_eq!(outcome, SessionOutcome::Captured);

        assert!(!pipeline.capture_now(CaptureTrigger::Manual).unwrap());
        assert_eq!(captures.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_source_end_waits_out_pending_capture() {
        let (mut pipeline, captures) = pipeline(
            StubSource::new(2),
            StubDetector::new(&[(0, -0.3), (1, 0.3)]),
            fast_config(Duration::from_millis(30)),
        );

        let started = Instant::now();
        let outcome = pipeline.run(&SessionHandle::new()).unwrap();

        assert_eq!(outcome, SessionOutcome::Captured);
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(captures.lock().unwrap()[0].frame_index, 1);
    }

    #[test]
    fn test_cancelled_before_start() {
        let source = StubSource::new(3);
        let stops = source.stops.clone();
        let (mut pipeline, captures) =
            pipeline(source, StubDetector::new(&[]), fast_config(Duration::ZERO));
        let handle = SessionHandle::new();
        handle.cancel();

        assert_eq!(pipeline.run(&handle).unwrap(), SessionOutcome::Cancelled);
        assert!(captures.lock().unwrap().is_empty());
        assert_eq!(*stops.lock().unwrap(), 1);
    }

    #[test]
    fn test_waits_for_source_readiness() {
        let mut source = StubSource::new(1);
        source.ready_after = 3;
        let (mut pipeline, _) =
            pipeline(source, StubDetector::new(&[]), fast_config(Duration::ZERO));

        let outcome = pipeline.run(&SessionHandle::new()).unwrap();
        assert_eq!(outcome, SessionOutcome::SourceEnded);
        assert_eq!(pipeline.phase(), SessionPhase::NoFace);
    }

    #[test]
    fn test_ready_timeout_errors_and_tears_down() {
        let mut source = StubSource::new(1);
        source.ready_after = usize::MAX;
        let stops = source.stops.clone();
        let config = LivenessConfig {
            ready_timeout: Some(Duration::from_millis(20)),
            ..fast_config(Duration::ZERO)
        };
        let (mut pipeline, _) = pipeline(source, StubDetector::new(&[]), config);

        let result = pipeline.run(&SessionHandle::new());

        assert!(matches!(result, Err(LivenessError::SourceNotReady(_))));
        assert_eq!(pipeline.phase(), SessionPhase::WaitingForSource);
        assert_eq!(*stops.lock().unwrap(), 1);
    }

    #[test]
    fn test_detector_error_ends_session() {
        let (mut pipeline, _) = pipeline(
            StubSource::new(2),
            FailingDetector,
            fast_config(Duration::ZERO),
        );

        let err = pipeline.run(&SessionHandle::new()).unwrap_err();
        assert!(matches!(err, LivenessError::Detection(_)));
        assert!(err.to_string().contains("model not loaded"));
    }

    #[test]
    fn test_teardown_swallows_stop_errors_and_runs_once() {
        let mut source = StubSource::new(1);
        source.fail_stop = true;
        let stops = source.stops.clone();
        let (mut pipeline, _) =
            pipeline(source, StubDetector::new(&[]), fast_config(Duration::ZERO));

        assert!(pipeline.run(&SessionHandle::new()).is_ok());
        pipeline.teardown();
        drop(pipeline);

        assert_eq!(*stops.lock().unwrap(), 1);
    }

    #[test]
    fn test_drop_tears_down_unrun_pipeline() {
        let source = StubSource::new(1);
        let stops = source.stops.clone();
        let (pipeline, _) = pipeline(source, StubDetector::new(&[]), fast_config(Duration::ZERO));

        drop(pipeline);

        assert_eq!(*stops.lock().unwrap(), 1);
    }

    #[test]
    fn test_overlay_emitted_only_for_faces() {
        let overlays = Arc::new(Mutex::new(Vec::new()));
        let sink = overlays.clone();
        let (pipeline, _) = pipeline(
            StubSource::new(3),
            StubDetector::new(&[(1, 0.0)]),
            fast_config(Duration::ZERO),
        );
        let mut pipeline = pipeline.on_overlay(move |overlay| sink.lock().unwrap().push(overlay));

        pipeline.run(&SessionHandle::new()).unwrap();

        let overlays = overlays.lock().unwrap();
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].frame_index, 1);
        assert_eq!((overlays[0].width, overlays[0].height), (8, 6));
    }

    #[test]
    fn test_no_capture_after_session_ended() {
        let (mut pipeline, captures) = pipeline(
            StubSource::new(2),
            StubDetector::new(&[]),
            fast_config(Duration::ZERO),
        );

        assert_eq!(
            pipeline.run(&SessionHandle::new()).unwrap(),
            SessionOutcome::SourceEnded
        );

        assert!(!pipeline.capture_now(CaptureTrigger::Manual).unwrap());
        assert!(!pipeline.state().captured());
        assert!(captures.lock().unwrap().is_empty());
    }

    #[test]
    fn test_ended_session_does_not_restart() {
        let source = StubSource::new(1);
        let stops = source.stops.clone();
        let (mut pipeline, _) =
            pipeline(source, StubDetector::new(&[]), fast_config(Duration::ZERO));
        pipeline.run(&SessionHandle::new()).unwrap();

        let started = Instant::now();
        let outcome = pipeline.run(&SessionHandle::new()).unwrap();

        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(*stops.lock().unwrap(), 1);
    }

    #[test]
    fn test_manual_capture_skips_empty_frame() {
        let mut source = StubSource::new(0);
        source.frames = VecDeque::from(vec![
            Frame::new(Vec::new(), 0, 0, 0),
            Frame::filled(8, 6, [10, 20, 30], 1),
        ]);
        let (mut pipeline, captures) =
            pipeline(source, StubDetector::new(&[]), fast_config(Duration::ZERO));
        let handle = SessionHandle::new();
        handle.request_capture();

        let outcome = pipeline.run(&handle).unwrap();

        assert_eq!(outcome, SessionOutcome::Captured);
        let captures = captures.lock().unwrap();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].frame_index, 1);
        assert!(!handle.capture_requested());
    }

    #[test]
    fn test_empty_last_frame_leaves_request_pending() {
        let mut source = StubSource::new(0);
        source.frames = VecDeque::from(vec![Frame::new(Vec::new(), 0, 0, 0)]);
        let (mut pipeline, captures) =
            pipeline(source, StubDetector::new(&[]), fast_config(Duration::ZERO));
        let handle = SessionHandle::new();
        handle.request_capture();

        let outcome = pipeline.run(&handle).unwrap();

        assert_eq!(outcome, SessionOutcome::SourceEnded);
        assert!(captures.lock().unwrap().is_empty());
        assert!(handle.capture_requested());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LivenessConfig {
            poll_interval: Duration::ZERO,
            ..LivenessConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(LivenessConfig::default().validate().is_ok());
    }
}

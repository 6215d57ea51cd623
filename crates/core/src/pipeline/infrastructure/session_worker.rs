use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::liveness::domain::captured_image::CapturedImage;
use crate::liveness::domain::nose_marker_overlay::Overlay;
use crate::liveness::domain::session_phase::SessionSnapshot;
use crate::pipeline::liveness_pipeline::{
    LivenessError, LivenessPipeline, SessionHandle, SessionOutcome,
};

/// Overlays are cosmetic; when the consumer lags, new ones are dropped
/// rather than queued.
const OVERLAY_CAPACITY: usize = 2;

#[derive(Debug)]
pub enum SessionEvent {
    Update(SessionSnapshot),
    Overlay(Overlay),
    Captured(CapturedImage),
    Finished(SessionOutcome),
    Error(LivenessError),
}

/// A pipeline running on its own thread.
///
/// `events` ends with exactly one `Finished` or `Error`. `overlays` is kept
/// apart so preview frames never hold up state updates. It stays empty
/// unless the worker was started with [`spawn_with_overlays`].
pub struct SessionWorker {
    pub events: Receiver<SessionEvent>,
    pub overlays: Receiver<SessionEvent>,
    pub handle: SessionHandle,
    pub thread: JoinHandle<()>,
}

/// Moves `pipeline` onto a dedicated thread and runs it without rendering
/// overlays.
///
/// Callbacks already set on the pipeline are replaced by channel senders.
pub fn spawn(pipeline: LivenessPipeline) -> SessionWorker {
    start(pipeline, false)
}

/// Like [`spawn`], and also streams nose-marker overlays on `overlays`.
pub fn spawn_with_overlays(pipeline: LivenessPipeline) -> SessionWorker {
    start(pipeline, true)
}

fn start(pipeline: LivenessPipeline, with_overlays: bool) -> SessionWorker {
    let handle = SessionHandle::new();
    let (event_tx, event_rx) = crossbeam_channel::unbounded::<SessionEvent>();
    let (overlay_tx, overlay_rx) = crossbeam_channel::bounded::<SessionEvent>(OVERLAY_CAPACITY);

    let mut pipeline = wire(pipeline, event_tx.clone());
    if with_overlays {
        pipeline = wire_overlays(pipeline, overlay_tx);
    }
    let session = handle.clone();
    let thread = std::thread::spawn(move || {
        let event = match pipeline.run(&session) {
            Ok(outcome) => SessionEvent::Finished(outcome),
            Err(e) => SessionEvent::Error(e),
        };
        if event_tx.send(event).is_err() {
            log::debug!("Session events receiver dropped before completion");
        }
    });

    SessionWorker {
        events: event_rx,
        overlays: overlay_rx,
        handle,
        thread,
    }
}

fn wire(pipeline: LivenessPipeline, event_tx: Sender<SessionEvent>) -> LivenessPipeline {
    let update_tx = event_tx.clone();
    pipeline
        .on_update(move |snapshot| {
            let _ = update_tx.send(SessionEvent::Update(snapshot));
        })
        .on_capture(move |image| {
            let _ = event_tx.send(SessionEvent::Captured(image));
        })
}

fn wire_overlays(pipeline: LivenessPipeline, overlay_tx: Sender<SessionEvent>) -> LivenessPipeline {
    pipeline.on_overlay(move |overlay| {
        if let Err(TrySendError::Full(_)) = overlay_tx.try_send(SessionEvent::Overlay(overlay)) {
            log::debug!("Overlay dropped, preview consumer is behind");
        }
    })
}

//! Session loop and collaborator seams
//!
//! Frame capture, face detection, landmark prediction and display are external
//! collaborators behind the traits below. [`SessionRunner`] drives them in a
//! single blocking loop:
//!
//! acquire frame -> detect faces -> predict landmarks -> classify -> record
//! -> render overlay -> poll for stop
//!
//! Cancellation is cooperative. The [`CancelToken`] is checked once per
//! iteration boundary, so a frame already being processed always completes.
//! Collaborators are owned by the runner and dropped when [`SessionRunner::run`]
//! returns. Failures inside a frame end the loop like a stop does, so the
//! session is always finished and reported.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::clock::Clock;
use crate::error::FocusError;
use crate::session::{FocusSession, SessionSummary};
use crate::types::{EyeLandmarks, FaceLandmarks, FaceRegion, FocusState};

/// Source of video frames. `Ok(None)` means the stream has ended.
pub trait FrameSource {
    type Frame;

    fn next_frame(&mut self) -> Result<Option<Self::Frame>, FocusError>;
}

/// Finds face regions in a frame
pub trait FaceDetector<F> {
    fn detect(&mut self, frame: &F) -> Result<Vec<FaceRegion>, FocusError>;
}

/// Predicts the 68 facial landmarks of one detected face
pub trait LandmarkPredictor<F> {
    fn predict(&mut self, frame: &F, region: &FaceRegion) -> Result<FaceLandmarks, FocusError>;
}

/// What the display draws on top of a frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOverlay {
    /// Eye landmark sets of every processed face
    pub eyes: Vec<EyeLandmarks>,
    pub state: FocusState,
    pub live_focus_seconds: f64,
}

impl FrameOverlay {
    /// Text readout shown on the frame
    pub fn label(&self) -> String {
        format!("Focus Time: {:.2}s", self.live_focus_seconds)
    }
}

/// Renders annotated frames and reports a user stop request
pub trait DisplaySink<F> {
    fn render(&mut self, frame: &F, overlay: &FrameOverlay) -> Result<(), FocusError>;

    /// Whether the user asked to stop; polled once per frame
    fn poll_stop(&mut self) -> Result<bool, FocusError> {
        Ok(false)
    }
}

/// Display that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl<F> DisplaySink<F> for NullDisplay {
    fn render(&mut self, _frame: &F, _overlay: &FrameOverlay) -> Result<(), FocusError> {
        Ok(())
    }
}

/// Poll-based stop signal shared with signal handlers or other threads
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The source reported no more frames
    EndOfStream,
    /// The capture device failed; treated as end of session
    CaptureFailed(String),
    /// The display's stop key or the cancel token
    UserStop,
    /// A frame could not be recorded or displayed; the session still finishes
    Aborted(String),
}

/// Finished session plus how it ended
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: SessionSummary,
    pub stop_reason: StopReason,
}

/// Blocking frame-processing loop over a set of collaborators
pub struct SessionRunner<S, D, P, V> {
    source: S,
    detector: D,
    predictor: P,
    display: V,
    cancel: CancelToken,
}

impl<S, D, P, V> SessionRunner<S, D, P, V>
where
    S: FrameSource,
    D: FaceDetector<S::Frame>,
    P: LandmarkPredictor<S::Frame>,
    V: DisplaySink<S::Frame>,
{
    pub fn new(source: S, detector: D, predictor: P, display: V) -> Self {
        Self {
            source,
            detector,
            predictor,
            display,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancel token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run until the stream ends, a stop is requested or a frame fails, then
    /// finish the session. Every exit path flushes the open focus interval.
    pub fn run<C: Clock>(mut self, mut session: FocusSession<C>) -> RunOutcome {
        let stop_reason = loop {
            if self.cancel.is_cancelled() {
                info!("stop requested");
                break StopReason::UserStop;
            }

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("frame source exhausted");
                    break StopReason::EndOfStream;
                }
                Err(e) => {
                    warn!("frame acquisition failed, ending session: {}", e);
                    break StopReason::CaptureFailed(e.to_string());
                }
            };

            match self.step(&mut session, &frame) {
                Ok(false) => {}
                Ok(true) => {
                    info!("stop key pressed");
                    break StopReason::UserStop;
                }
                Err(e) => {
                    warn!("frame processing failed, ending session: {}", e);
                    break StopReason::Aborted(e.to_string());
                }
            }
        };

        RunOutcome {
            summary: session.finish(),
            stop_reason,
        }
    }

    /// Process one acquired frame; returns whether the display asked to stop
    fn step<C: Clock>(&mut self, session: &mut FocusSession<C>, frame: &S::Frame) -> Result<bool, FocusError> {
        let sampled_at = session.now();

        let faces = self.landmarks_for(frame);
        let update = session.process_faces(sampled_at, &faces)?;
        debug!(
            "frame at {:.3}s: {} ({} faces)",
            update.t,
            update.classification.state.as_str(),
            faces.len()
        );

        let overlay = FrameOverlay {
            eyes: faces
                .iter()
                .flat_map(|face| [face.left_eye(), face.right_eye()])
                .collect(),
            state: update.classification.state,
            live_focus_seconds: update.live_focus_seconds,
        };
        self.display.render(frame, &overlay)?;
        self.display.poll_stop()
    }

    /// Detection and prediction failures degrade to "no face" for that face
    fn landmarks_for(&mut self, frame: &S::Frame) -> Vec<FaceLandmarks> {
        let regions = match self.detector.detect(frame) {
            Ok(regions) => regions,
            Err(e) => {
                warn!("face detection failed: {}", e);
                return Vec::new();
            }
        };

        regions
            .iter()
            .filter_map(|region| match self.predictor.predict(frame, region) {
                Ok(landmarks) => Some(landmarks),
                Err(e) => {
                    warn!("landmark prediction failed for {:?}: {}", region, e);
                    None
                }
            })
            .collect()
    }
}

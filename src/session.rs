//! Focus session state
//!
//! [`FocusSession`] owns everything that lives for one session: the
//! classifier, the accumulation state machine, the timeline and frame counts.
//! It is created at session start and consumed by [`FocusSession::finish`].

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use uuid::Uuid;

use crate::classifier::{ClassificationOutcome, FocusClassifier, FrameClassification};
use crate::clock::{Clock, SystemClock};
use crate::config::FocusConfig;
use crate::error::FocusError;
use crate::timeline::Timeline;
use crate::tracker::{FocusTotals, FocusTracker, Transition};
use crate::types::{FaceLandmarks, FrameCounts};

/// What a single processed frame changed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    /// Elapsed session time the frame was sampled at
    pub t: f64,
    pub classification: FrameClassification,
    pub transition: Option<Transition>,
    /// Focus time including any open interval, for on-screen readouts
    pub live_focus_seconds: f64,
}

/// Everything a finished session produced
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub config: FocusConfig,
    pub totals: FocusTotals,
    pub session_seconds: f64,
    pub frames: FrameCounts,
    pub timeline: Timeline,
}

/// Per-session focus estimator
pub struct FocusSession<C: Clock = SystemClock> {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    config: FocusConfig,
    clock: C,
    classifier: FocusClassifier,
    tracker: FocusTracker,
    timeline: Timeline,
    frames: FrameCounts,
}

impl FocusSession<SystemClock> {
    /// Start a live session on the system clock
    pub fn start(config: FocusConfig) -> Result<Self, FocusError> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> FocusSession<C> {
    /// Start a session on the given clock
    pub fn with_clock(config: FocusConfig, clock: C) -> Result<Self, FocusError> {
        config.validate()?;
        let session_id = Uuid::new_v4();
        info!(
            "focus session {} started (threshold {})",
            session_id, config.ear_threshold
        );
        Ok(Self {
            session_id,
            started_at: Utc::now(),
            config,
            clock,
            classifier: FocusClassifier::new(&config),
            tracker: FocusTracker::new(),
            timeline: Timeline::new(),
            frames: FrameCounts::default(),
        })
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn frames(&self) -> FrameCounts {
        self.frames
    }

    /// Elapsed session time; call when a frame is acquired
    pub fn now(&self) -> f64 {
        self.clock.elapsed()
    }

    /// Focus time so far, including the open interval
    pub fn live_focus_seconds(&self) -> f64 {
        self.tracker.live_total(self.clock.elapsed())
    }

    /// Classify a frame's faces and record it
    pub fn process_faces(
        &mut self,
        sampled_at: f64,
        faces: &[FaceLandmarks],
    ) -> Result<FrameUpdate, FocusError> {
        let classification = self.classifier.classify_faces(faces);
        self.record(sampled_at, classification)
    }

    /// Record an already classified frame.
    ///
    /// The timeline gets the classification at `sampled_at`; the state machine
    /// sees it at the current clock time.
    pub fn record(
        &mut self,
        sampled_at: f64,
        classification: FrameClassification,
    ) -> Result<FrameUpdate, FocusError> {
        self.timeline.push(sampled_at, classification.state)?;

        self.frames.total += 1;
        match classification.outcome {
            ClassificationOutcome::NoFace => self.frames.no_face += 1,
            ClassificationOutcome::Degenerate => self.frames.degenerate += 1,
            ClassificationOutcome::Classified { .. } => {}
        }
        if classification.state.is_focused() {
            self.frames.focused += 1;
        }

        let now = self.clock.elapsed();
        let transition = self.tracker.observe(classification.state, now);

        Ok(FrameUpdate {
            t: sampled_at,
            classification,
            transition,
            live_focus_seconds: self.tracker.live_total(now),
        })
    }

    /// End the session, flushing any open focused interval
    pub fn finish(self) -> SessionSummary {
        let now = self.clock.elapsed();
        let totals = self.tracker.finish(now);
        info!(
            "focus session {} finished: {:.2}s focused over {} frames",
            self.session_id, totals.total_focus_seconds, self.frames.total
        );
        SessionSummary {
            session_id: self.session_id,
            started_at: self.started_at,
            ended_at: Utc::now(),
            config: self.config,
            totals,
            session_seconds: now,
            frames: self.frames,
            timeline: self.timeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::{degenerate_face, face_with_ear};
    use crate::clock::ManualClock;
    use crate::types::FocusState;
    use approx::assert_relative_eq;

    fn session() -> (FocusSession<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let session = FocusSession::with_clock(FocusConfig::default(), clock.clone()).unwrap();
        (session, clock)
    }

    fn feed(session: &mut FocusSession<ManualClock>, clock: &ManualClock, t: f64, face: Option<FaceLandmarks>) {
        clock.set(t);
        let faces: Vec<_> = face.into_iter().collect();
        session.process_faces(t, &faces).unwrap();
    }

    #[test]
    fn test_ten_focused_frames_over_two_seconds() {
        let (mut session, clock) = session();
        for i in 0..10 {
            feed(&mut session, &clock, i as f64 * 2.0 / 9.0, Some(face_with_ear(0.3)));
        }
        let summary = session.finish();

        assert_relative_eq!(summary.totals.total_focus_seconds, 2.0, epsilon = 1e-9);
        assert_eq!(summary.timeline.len(), 10);
        assert_eq!(summary.frames.total, 10);
        assert_eq!(summary.frames.focused, 10);
    }

    #[test]
    fn test_transition_uses_clock_time_not_sample_time() {
        let (mut session, clock) = session();

        // Sampled at 0.0 but classified once processing finished at 0.25
        clock.set(0.25);
        let update = session.process_faces(0.0, &[face_with_ear(0.3)]).unwrap();
        assert_eq!(update.transition, Some(Transition::FocusStarted { at: 0.25 }));
        assert_eq!(session.timeline().samples()[0].t, 0.0);

        clock.set(1.25);
        let update = session.process_faces(1.0, &[]).unwrap();
        assert_eq!(
            update.transition,
            Some(Transition::FocusEnded { at: 1.25, duration: 1.0 })
        );
    }

    #[test]
    fn test_timeline_flags_follow_classification() {
        let (mut session, clock) = session();
        let script = [
            Some(face_with_ear(0.3)),
            None,
            Some(degenerate_face()),
            Some(face_with_ear(0.1)),
            Some(face_with_ear(0.4)),
        ];
        for (i, face) in script.into_iter().enumerate() {
            feed(&mut session, &clock, i as f64 * 0.5, face);
        }

        let flags: Vec<u8> = session.timeline().samples().iter().map(|s| s.focused).collect();
        assert_eq!(flags, vec![1, 0, 0, 0, 1]);

        let frames = session.frames();
        assert_eq!(frames.total, 5);
        assert_eq!(frames.focused, 2);
        assert_eq!(frames.no_face, 1);
        assert_eq!(frames.degenerate, 1);
    }

    #[test]
    fn test_scripted_sequence_with_tail_flush() {
        let (mut session, clock) = session();
        let open = || Some(face_with_ear(0.3));
        let closed = || Some(face_with_ear(0.1));
        for (t, face) in [(0.0, open()), (0.5, open()), (1.0, closed()), (1.5, closed()), (2.0, open())] {
            feed(&mut session, &clock, t, face);
        }

        assert_relative_eq!(session.live_focus_seconds(), 1.0, epsilon = 1e-9);

        clock.set(2.5);
        let summary = session.finish();
        assert_relative_eq!(summary.totals.total_focus_seconds, 1.5, epsilon = 1e-9);
        assert_eq!(summary.totals.focus_runs, 2);
        assert_relative_eq!(summary.session_seconds, 2.5);
    }

    #[test]
    fn test_out_of_order_sample_is_rejected_without_side_effects() {
        let (mut session, clock) = session();
        feed(&mut session, &clock, 1.0, Some(face_with_ear(0.3)));

        let result = session.process_faces(0.5, &[]);
        assert!(matches!(result, Err(FocusError::NonMonotonicTimestamp { .. })));
        assert_eq!(session.frames().total, 1);
        assert_eq!(session.timeline().len(), 1);
        assert_eq!(session.tracker.state(), FocusState::Focused);
    }

    #[test]
    fn test_invalid_threshold_rejected_at_start() {
        let config = FocusConfig { ear_threshold: 2.0 };
        assert!(FocusSession::with_clock(config, ManualClock::new()).is_err());
    }
}

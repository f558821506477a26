//! Focus-time accumulation
//!
//! Two states, `Distracted` (initial) and `Focused`. Entering `Focused` stamps
//! the transition time; leaving it adds the elapsed interval to the running
//! total. Repeated classifications leave the total untouched. Consuming the
//! tracker with [`FocusTracker::finish`] flushes an open interval exactly once.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::types::FocusState;

/// A state change produced by [`FocusTracker::observe`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Distracted -> Focused at `at` seconds
    FocusStarted { at: f64 },
    /// Focused -> Distracted at `at` seconds, closing an interval of `duration`
    FocusEnded { at: f64, duration: f64 },
}

/// Accumulated focus statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FocusTotals {
    /// Sum of all closed focused intervals (seconds)
    pub total_focus_seconds: f64,
    /// Number of closed focused intervals
    pub focus_runs: u32,
    /// Longest closed focused interval (seconds)
    pub longest_focus_seconds: f64,
}

impl FocusTotals {
    fn close_interval(&mut self, duration: f64) {
        self.total_focus_seconds += duration;
        self.focus_runs += 1;
        if duration > self.longest_focus_seconds {
            self.longest_focus_seconds = duration;
        }
    }
}

/// Focus accumulation state machine
#[derive(Debug, Clone, Default)]
pub struct FocusTracker {
    state: FocusState,
    focus_start: Option<f64>,
    totals: FocusTotals,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    /// Totals over closed intervals only
    pub fn totals(&self) -> FocusTotals {
        self.totals
    }

    /// Feed one frame's classification observed at `now` seconds
    pub fn observe(&mut self, classified: FocusState, now: f64) -> Option<Transition> {
        match (self.state, classified) {
            (FocusState::Distracted, FocusState::Focused) => {
                self.state = FocusState::Focused;
                self.focus_start = Some(now);
                debug!("focus started at {:.3}s", now);
                Some(Transition::FocusStarted { at: now })
            }
            (FocusState::Focused, FocusState::Distracted) => {
                self.state = FocusState::Distracted;
                let duration = self.close(now);
                debug!("focus ended at {:.3}s after {:.3}s", now, duration);
                Some(Transition::FocusEnded { at: now, duration })
            }
            _ => None,
        }
    }

    /// Accumulated time plus the open interval, for live readouts
    pub fn live_total(&self, now: f64) -> f64 {
        let open = self
            .focus_start
            .map(|start| (now - start).max(0.0))
            .unwrap_or(0.0);
        self.totals.total_focus_seconds + open
    }

    /// End the session, flushing an open focused interval
    pub fn finish(mut self, now: f64) -> FocusTotals {
        if self.state.is_focused() {
            let duration = self.close(now);
            debug!("flushed open focus interval of {:.3}s at session end", duration);
        }
        self.totals
    }

    fn close(&mut self, now: f64) -> f64 {
        // A clock that steps backwards must not shrink the total
        let duration = self
            .focus_start
            .take()
            .map(|start| (now - start).max(0.0))
            .unwrap_or(0.0);
        self.totals.close_interval(duration);
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use FocusState::{Distracted as D, Focused as F};

    fn run(script: &[(FocusState, f64)], end: f64) -> FocusTotals {
        let mut tracker = FocusTracker::new();
        for &(state, t) in script {
            tracker.observe(state, t);
        }
        tracker.finish(end)
    }

    #[test]
    fn test_starts_distracted_with_zero_total() {
        let tracker = FocusTracker::new();
        assert_eq!(tracker.state(), D);
        assert_eq!(tracker.live_total(10.0), 0.0);
        assert_eq!(tracker.finish(10.0), FocusTotals::default());
    }

    #[test]
    fn test_all_focused_frames_over_two_seconds() {
        let script: Vec<_> = (0..10).map(|i| (F, i as f64 * 2.0 / 9.0)).collect();
        let totals = run(&script, 2.0);

        assert_relative_eq!(totals.total_focus_seconds, 2.0, epsilon = 1e-9);
        assert_eq!(totals.focus_runs, 1);
    }

    #[test]
    fn test_mixed_sequence_flushes_twice() {
        let script = [(F, 0.0), (F, 0.5), (D, 1.0), (D, 1.5), (F, 2.0)];
        let mut tracker = FocusTracker::new();

        let transitions: Vec<_> = script
            .iter()
            .filter_map(|&(state, t)| tracker.observe(state, t))
            .collect();
        assert_eq!(
            transitions,
            vec![
                Transition::FocusStarted { at: 0.0 },
                Transition::FocusEnded { at: 1.0, duration: 1.0 },
                Transition::FocusStarted { at: 2.0 },
            ]
        );

        let totals = tracker.finish(2.75);
        assert_relative_eq!(totals.total_focus_seconds, 1.75, epsilon = 1e-9);
        assert_eq!(totals.focus_runs, 2);
        assert_relative_eq!(totals.longest_focus_seconds, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_total_is_sum_of_maximal_focused_runs() {
        // runs: [1, 3) = 2s, [4, 4.5) = 0.5s, [6, end=9) = 3s
        let script = [
            (D, 0.0),
            (F, 1.0),
            (F, 2.0),
            (D, 3.0),
            (F, 4.0),
            (D, 4.5),
            (D, 5.0),
            (F, 6.0),
            (F, 7.0),
        ];
        let totals = run(&script, 9.0);

        assert_relative_eq!(totals.total_focus_seconds, 5.5, epsilon = 1e-9);
        assert_eq!(totals.focus_runs, 3);
        assert_relative_eq!(totals.longest_focus_seconds, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_self_transitions_do_not_touch_accumulator() {
        let mut tracker = FocusTracker::new();
        assert_eq!(tracker.observe(D, 0.0), None);
        assert_eq!(tracker.observe(D, 1.0), None);
        tracker.observe(F, 2.0);
        assert_eq!(tracker.observe(F, 3.0), None);
        assert_eq!(tracker.totals().total_focus_seconds, 0.0);
    }

    #[test]
    fn test_session_ending_focused_flushes_once() {
        let mut tracker = FocusTracker::new();
        tracker.observe(F, 1.0);
        tracker.observe(D, 2.0);
        tracker.observe(F, 3.0);

        let totals = tracker.finish(5.0);
        assert_relative_eq!(totals.total_focus_seconds, 3.0, epsilon = 1e-9);
        assert_eq!(totals.focus_runs, 2);
    }

    #[test]
    fn test_session_ending_distracted_adds_nothing() {
        let totals = run(&[(F, 0.0), (D, 1.0)], 100.0);
        assert_relative_eq!(totals.total_focus_seconds, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_live_total_includes_open_interval() {
        let mut tracker = FocusTracker::new();
        tracker.observe(F, 0.0);
        tracker.observe(D, 1.0);
        tracker.observe(F, 2.0);

        assert_relative_eq!(tracker.live_total(2.5), 1.5, epsilon = 1e-9);
        assert_relative_eq!(tracker.totals().total_focus_seconds, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_accumulator_never_decreases() {
        let mut tracker = FocusTracker::new();
        let mut last = 0.0;
        for (i, state) in [F, D, F, F, D, D, F, D].into_iter().enumerate() {
            tracker.observe(state, i as f64 * 0.3);
            let total = tracker.totals().total_focus_seconds;
            assert!(total >= last);
            last = total;
        }

        // Backwards clock on close clamps to zero instead of subtracting
        let mut tracker = FocusTracker::new();
        tracker.observe(F, 5.0);
        tracker.observe(D, 4.0);
        assert_eq!(tracker.totals().total_focus_seconds, 0.0);
    }
}

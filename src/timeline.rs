//! Session timeline
//!
//! One sample per processed frame, in frame order, used for the end-of-session
//! chart and summary statistics.

use serde::{Deserialize, Serialize};

use crate::error::FocusError;
use crate::types::{FocusState, TimelineSample};

/// Ordered `(elapsed, flag)` samples with strictly increasing time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    samples: Vec<TimelineSample>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame sample. Time must strictly increase.
    pub fn push(&mut self, t: f64, state: FocusState) -> Result<(), FocusError> {
        let previous = self.last_time();
        let ordered = t.is_finite() && previous.map_or(true, |p| t > p);
        if !ordered {
            return Err(FocusError::NonMonotonicTimestamp {
                previous: previous.unwrap_or(0.0),
                current: t,
            });
        }
        self.samples.push(TimelineSample {
            t,
            focused: state.as_flag(),
        });
        Ok(())
    }

    pub fn samples(&self) -> &[TimelineSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.samples.last().map(|s| s.t)
    }

    pub fn into_samples(self) -> Vec<TimelineSample> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_records_flags_in_order() {
        let mut timeline = Timeline::new();
        timeline.push(0.0, FocusState::Focused).unwrap();
        timeline.push(0.1, FocusState::Distracted).unwrap();
        timeline.push(0.2, FocusState::Focused).unwrap();

        assert_eq!(
            timeline.samples(),
            &[
                TimelineSample { t: 0.0, focused: 1 },
                TimelineSample { t: 0.1, focused: 0 },
                TimelineSample { t: 0.2, focused: 1 },
            ]
        );
    }

    #[test]
    fn test_push_rejects_non_increasing_time() {
        let mut timeline = Timeline::new();
        timeline.push(1.0, FocusState::Focused).unwrap();

        assert!(timeline.push(1.0, FocusState::Focused).is_err());
        assert!(timeline.push(0.5, FocusState::Focused).is_err());
        assert!(timeline.push(f64::NAN, FocusState::Focused).is_err());
        assert_eq!(timeline.len(), 1);
    }
}

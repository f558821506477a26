//! Per-frame focus classification
//!
//! A frame is focused when the average EAR of a detected face exceeds the
//! threshold. No face, or a face whose eye geometry is degenerate, leaves the
//! frame distracted.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::FocusConfig;
use crate::ear::EarReading;
use crate::error::FocusError;
use crate::types::{FaceLandmarks, FocusState};

/// How a frame's classification was reached
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClassificationOutcome {
    /// At least one face produced an EAR reading
    Classified { ear: EarReading },
    /// No face in the frame
    NoFace,
    /// Faces were present but none had measurable eye geometry
    Degenerate,
}

/// Result of classifying one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameClassification {
    pub state: FocusState,
    #[serde(flatten)]
    pub outcome: ClassificationOutcome,
}

impl FrameClassification {
    pub fn no_face() -> Self {
        Self {
            state: FocusState::Distracted,
            outcome: ClassificationOutcome::NoFace,
        }
    }
}

/// Stateless EAR threshold classifier
#[derive(Debug, Clone, Copy)]
pub struct FocusClassifier {
    threshold: f64,
}

impl Default for FocusClassifier {
    fn default() -> Self {
        Self::new(&FocusConfig::default())
    }
}

impl FocusClassifier {
    pub fn new(config: &FocusConfig) -> Self {
        Self {
            threshold: config.ear_threshold,
        }
    }

    /// Classify an averaged EAR value
    pub fn classify_ear(&self, average_ear: f64) -> FocusState {
        if average_ear > self.threshold {
            FocusState::Focused
        } else {
            FocusState::Distracted
        }
    }

    /// Classify a frame from every face's landmarks.
    ///
    /// Any face above the threshold makes the frame focused. The reported
    /// reading is the one that decided the frame, or the last measurable
    /// one when no face qualified.
    pub fn classify_faces(&self, faces: &[FaceLandmarks]) -> FrameClassification {
        if faces.is_empty() {
            return FrameClassification::no_face();
        }

        let mut reported: Option<EarReading> = None;
        for face in faces {
            match EarReading::from_face(face) {
                Ok(reading) => {
                    reported = Some(reading);
                    if self.classify_ear(reading.average).is_focused() {
                        return FrameClassification {
                            state: FocusState::Focused,
                            outcome: ClassificationOutcome::Classified { ear: reading },
                        };
                    }
                }
                Err(FocusError::DegenerateEye) => {
                    warn!("skipping face with degenerate eye geometry");
                }
                Err(e) => {
                    warn!("skipping face: {}", e);
                }
            }
        }

        match reported {
            Some(ear) => FrameClassification {
                state: FocusState::Distracted,
                outcome: ClassificationOutcome::Classified { ear },
            },
            None => FrameClassification {
                state: FocusState::Distracted,
                outcome: ClassificationOutcome::Degenerate,
            },
        }
    }
}

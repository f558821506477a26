//! Error types for focus-meter

use thiserror::Error;

use crate::recording::ValidationError;

/// Errors that can occur while estimating focus
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("Expected {expected} landmarks, got {actual}")]
    InvalidLandmarkCount { expected: usize, actual: usize },

    #[error("Degenerate eye geometry: corner distance is zero")]
    DegenerateEye,

    #[error("Invalid EAR threshold: {0}")]
    InvalidThreshold(f64),

    #[error("Timestamp {current}s does not follow {previous}s")]
    NonMonotonicTimestamp { previous: f64, current: f64 },

    #[error("Failed to parse recorded frames: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid recorded frame: {0}")]
    Validation(#[from] ValidationError),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Chart rendering error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "camera")]
impl From<opencv::Error> for FocusError {
    fn from(e: opencv::Error) -> Self {
        FocusError::Capture(e.to_string())
    }
}
